//! Design-time type system for UDM transformations.
//!
//! Import a schema into a [`TypeEnvironment`], infer the output type of a
//! transformation expression against it, and render that type back out as
//! JSON Schema or XSD.
pub mod ast;
pub mod cli;
pub mod diff;
pub mod env;
pub mod error;
pub mod export;
pub mod import;
pub mod infer;
pub mod path_de;
pub mod registry;
pub mod types;

pub use env::TypeEnvironment;
pub use error::{ImportError, SchemaGenerationError, TypeInferenceError};
pub use export::{RenderedSchema, SchemaFormat, generate_schema};
pub use import::{ParsedSchema, build_type_environment};
pub use infer::{InferenceEngine, infer_expression_type};
pub use registry::{FunctionRegistry, FunctionSignature};
pub use types::{PropertyInfo, UdmType};
