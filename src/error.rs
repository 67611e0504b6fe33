//! Error types for import, inference and export.
//!
//! Inference is fail-fast: the first error aborts the whole call and comes
//! back with whatever source location the offending node carried.
use thiserror::Error;

use crate::ast::SourceLocation;
use crate::export::SchemaFormat;
use crate::types::UdmType;

/// A type error found while inferring an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeInferenceError {
    #[error("unknown path '{path}'")]
    UnknownPath {
        path: String,
        location: Option<SourceLocation>,
    },

    #[error("unknown function '{name}'")]
    UnknownFunction {
        name: String,
        location: Option<SourceLocation>,
    },

    #[error("{name} expects {} argument(s), found {found}", arity_text(.min, .max))]
    ArityError {
        name: String,
        min: usize,
        max: Option<usize>,
        found: usize,
        location: Option<SourceLocation>,
    },

    #[error("type mismatch in {context}: expected {expected}, actual {actual}")]
    TypeMismatch {
        expected: UdmType,
        actual: UdmType,
        context: String,
        location: Option<SourceLocation>,
    },

    #[error("non-boolean condition: expected Boolean, found {actual}")]
    NonBooleanCondition {
        actual: UdmType,
        location: Option<SourceLocation>,
    },

    #[error("{operation} expects an array, found {actual}")]
    NonArrayCollection {
        operation: String,
        actual: UdmType,
        location: Option<SourceLocation>,
    },

    #[error("{function}: type parameter {parameter} is bound to {bound} but an argument of type {conflicting} was passed")]
    GenericBindingConflict {
        function: String,
        parameter: String,
        bound: UdmType,
        conflicting: UdmType,
        location: Option<SourceLocation>,
    },
}

impl TypeInferenceError {
    /// Source location of the node that raised this error.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            TypeInferenceError::UnknownPath { location, .. }
            | TypeInferenceError::UnknownFunction { location, .. }
            | TypeInferenceError::ArityError { location, .. }
            | TypeInferenceError::TypeMismatch { location, .. }
            | TypeInferenceError::NonBooleanCondition { location, .. }
            | TypeInferenceError::NonArrayCollection { location, .. }
            | TypeInferenceError::GenericBindingConflict { location, .. } => location.as_ref(),
        }
    }

    /// Stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TypeInferenceError::UnknownPath { .. } => "UnknownPath",
            TypeInferenceError::UnknownFunction { .. } => "UnknownFunction",
            TypeInferenceError::ArityError { .. } => "ArityError",
            TypeInferenceError::TypeMismatch { .. } => "TypeMismatch",
            TypeInferenceError::NonBooleanCondition { .. } => "NonBooleanCondition",
            TypeInferenceError::NonArrayCollection { .. } => "NonArrayCollection",
            TypeInferenceError::GenericBindingConflict { .. } => "GenericBindingConflict",
        }
    }
}

fn arity_text(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) if max == min => format!("{min}"),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    }
}

/// A parsed schema that cannot be mapped onto the type model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("unresolved reference '{reference}'")]
    UnresolvedReference { reference: String },

    #[error("recursive reference '{reference}' cannot be expanded into a finite type")]
    RecursiveReference { reference: String },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("unsupported construct at {path}: {message}")]
    Unsupported { path: String, message: String },

    #[error("malformed document at {path}: {message}")]
    Malformed { path: String, message: String },
}

/// A type that has no rendering in the requested schema notation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaGenerationError {
    #[error("type {ty} cannot be rendered as {format}: {reason}")]
    UnsupportedTypeForFormat {
        ty: UdmType,
        format: SchemaFormat,
        reason: String,
    },
}
