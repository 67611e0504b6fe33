//! Static type inference over the expression tree.
//!
//! The engine borrows a root [`TypeEnvironment`] and a [`FunctionRegistry`]
//! and is otherwise stateless. Lambda and `let` bodies are inferred in child
//! scopes that live on the stack for the duration of that one sub-call.
//! Inference is fail-fast: the first error is returned as-is.
use tracing::trace;

use crate::ast::{BinaryOp, Expr, ExprKind, Lambda, Literal, ObjectEntry, SourceLocation, UnaryOp};
use crate::env::{self, TypeEnvironment};
use crate::error::TypeInferenceError;
use crate::registry::{FunctionRegistry, FunctionSignature};
use crate::types::{Bindings, PropertyInfo, UdmType, is_subtype, substitute_closed, unify};

type Result<T> = std::result::Result<T, TypeInferenceError>;

/// Infer the type of `expr` against a schema environment.
pub fn infer_expression_type(
    expr: &Expr,
    env: &TypeEnvironment<'_>,
    registry: &FunctionRegistry,
) -> Result<UdmType> {
    InferenceEngine::new(env, registry).infer(expr)
}

#[derive(Debug, Clone, Copy)]
pub struct InferenceEngine<'a> {
    env: &'a TypeEnvironment<'a>,
    registry: &'a FunctionRegistry,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(env: &'a TypeEnvironment<'a>, registry: &'a FunctionRegistry) -> Self {
        Self { env, registry }
    }

    pub fn infer(&self, expr: &Expr) -> Result<UdmType> {
        self.infer_in(expr, self.env)
    }

    fn infer_in(&self, expr: &Expr, env: &TypeEnvironment<'_>) -> Result<UdmType> {
        let loc = || expr.location.clone();
        match &expr.kind {
            ExprKind::Literal { value } => Ok(literal_type(value)),

            ExprKind::Path { path } => env
                .lookup_nested(path)
                .ok_or_else(|| TypeInferenceError::UnknownPath { path: path.clone(), location: loc() }),

            ExprKind::Member { object, property } => {
                let object_ty = self.infer_in(object, env)?;
                env::descend(&object_ty, property).ok_or_else(|| TypeInferenceError::UnknownPath {
                    path: format!("{}.{property}", path_text(object)),
                    location: loc(),
                })
            }

            ExprKind::Unary { op, operand } => {
                let ty = self.infer_in(operand, env)?;
                unary_type(*op, ty, loc())
            }

            ExprKind::Binary { op, left, right } => {
                let l = self.infer_in(left, env)?;
                let r = self.infer_in(right, env)?;
                binary_type(*op, l, r, loc())
            }

            ExprKind::Conditional { condition, then_branch, else_branch } => {
                let cond = self.infer_in(condition, env)?;
                if !is_boolean(&cond) {
                    return Err(TypeInferenceError::NonBooleanCondition { actual: cond, location: loc() });
                }
                let then_ty = self.infer_in(then_branch, env)?;
                let else_ty = self.infer_in(else_branch, env)?;
                Ok(unify(&then_ty, &else_ty))
            }

            ExprKind::Call { name, args } => self.infer_call(name, args, loc(), env),

            ExprKind::Map { collection, lambda } => {
                let element = self.collection_element("map", collection, loc(), env)?;
                let body = self.infer_lambda(lambda, &[element], env)?;
                Ok(UdmType::array(body))
            }

            ExprKind::Filter { collection, lambda } => {
                let input = self.infer_in(collection, env)?;
                let element = element_of("filter", &input, loc())?;
                let body = self.infer_lambda(lambda, &[element], env)?;
                if !is_boolean(&body) {
                    return Err(TypeInferenceError::NonBooleanCondition { actual: body, location: loc() });
                }
                Ok(match input {
                    UdmType::Any => UdmType::array(UdmType::Any),
                    array => array,
                })
            }

            ExprKind::Lambda(lambda) => {
                let params = vec![UdmType::Any; lambda.params.len()];
                let body = self.infer_lambda(lambda, &params, env)?;
                Ok(UdmType::function(params, body))
            }

            ExprKind::Let { name, value, body } => {
                let value_ty = self.infer_in(value, env)?;
                let scope = env.create_child(name.as_str(), value_ty);
                self.infer_in(body, &scope)
            }

            ExprKind::Object { entries } => {
                let mut properties = Vec::with_capacity(entries.len());
                for ObjectEntry { key, value } in entries {
                    properties.push((key.as_str(), PropertyInfo::required(self.infer_in(value, env)?)));
                }
                Ok(UdmType::object(properties))
            }

            ExprKind::Array { elements } => {
                let mut element: Option<UdmType> = None;
                for el in elements {
                    let ty = self.infer_in(el, env)?;
                    element = Some(match element {
                        Some(acc) => unify(&acc, &ty),
                        None => ty,
                    });
                }
                Ok(UdmType::array(element.unwrap_or(UdmType::Any)))
            }
        }
    }

    fn collection_element(
        &self,
        operation: &str,
        collection: &Expr,
        location: Option<SourceLocation>,
        env: &TypeEnvironment<'_>,
    ) -> Result<UdmType> {
        let ty = self.infer_in(collection, env)?;
        element_of(operation, &ty, location)
    }

    /// Infer a lambda body with its parameters bound positionally. Parameters
    /// beyond `param_types` are bound to `Any`.
    fn infer_lambda(&self, lambda: &Lambda, param_types: &[UdmType], env: &TypeEnvironment<'_>) -> Result<UdmType> {
        let named: Vec<(&str, UdmType)> = lambda
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), param_types.get(i).cloned().unwrap_or(UdmType::Any)))
            .collect();
        self.infer_scoped(&lambda.body, &named, env)
    }

    fn infer_scoped(&self, body: &Expr, params: &[(&str, UdmType)], env: &TypeEnvironment<'_>) -> Result<UdmType> {
        match params.split_first() {
            None => self.infer_in(body, env),
            Some(((name, ty), rest)) => {
                let scope = env.create_child(*name, ty.clone());
                self.infer_scoped(body, rest, &scope)
            }
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // CALLS
    // ————————————————————————————————————————————————————————————————————————

    fn infer_call(
        &self,
        name: &str,
        args: &[Expr],
        location: Option<SourceLocation>,
        env: &TypeEnvironment<'_>,
    ) -> Result<UdmType> {
        let Some(sig) = self.registry.lookup(name) else {
            return Err(TypeInferenceError::UnknownFunction { name: name.to_string(), location });
        };
        let arity_error = || TypeInferenceError::ArityError {
            name: name.to_string(),
            min: sig.min_args,
            max: sig.max_args,
            found: args.len(),
            location: location.clone(),
        };
        if !sig.accepts_arity(args.len()) {
            return Err(arity_error());
        }

        let mut bindings = Bindings::new();
        let mut deferred: Vec<(usize, &Lambda, &[UdmType], &UdmType)> = Vec::new();

        // Plain arguments first so lambdas see their element types bound.
        for (index, arg) in args.iter().enumerate() {
            let param = sig.param_at(index).ok_or_else(arity_error)?;
            match (&arg.kind, param) {
                (ExprKind::Lambda(lambda), UdmType::Function(f)) => {
                    deferred.push((index, lambda, f.params.as_slice(), f.return_type.as_ref()));
                }
                _ => {
                    let actual = self.infer_in(arg, env)?;
                    check_argument(sig, index, param, &actual, &mut bindings, &location)?;
                }
            }
        }

        for (index, lambda, params, returns) in deferred {
            if lambda.params.len() > params.len() {
                return Err(TypeInferenceError::TypeMismatch {
                    expected: substitute_closed(&UdmType::function(params.to_vec(), returns.clone()), &bindings),
                    actual: UdmType::function(vec![UdmType::Any; lambda.params.len()], UdmType::Any),
                    context: argument_context(index, name),
                    location,
                });
            }
            let param_types: Vec<UdmType> = params.iter().map(|p| substitute_closed(p, &bindings)).collect();
            let body = self.infer_lambda(lambda, &param_types, env)?;
            check_argument(sig, index, returns, &body, &mut bindings, &location)?;
        }

        let result = substitute_closed(&sig.return_type, &bindings);
        trace!(function = name, ?bindings, result = %result, "resolved call");
        Ok(result)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ARGUMENT MATCHING
// ————————————————————————————————————————————————————————————————————————————

enum MatchFailure {
    Mismatch,
    Conflict { parameter: String, bound: UdmType, conflicting: UdmType },
}

fn check_argument(
    sig: &FunctionSignature,
    index: usize,
    param: &UdmType,
    actual: &UdmType,
    bindings: &mut Bindings,
    location: &Option<SourceLocation>,
) -> Result<()> {
    if matches!(param, UdmType::Array(_)) && !matches!(actual, UdmType::Array(_) | UdmType::Any) && !is_subtype(actual, param) {
        if sig.params.iter().any(|p| matches!(p, UdmType::Function(_))) {
            return Err(TypeInferenceError::NonArrayCollection {
                operation: sig.name.clone(),
                actual: actual.clone(),
                location: location.clone(),
            });
        }
    }
    match match_type(param, actual, bindings) {
        Ok(()) => Ok(()),
        Err(MatchFailure::Mismatch) => Err(TypeInferenceError::TypeMismatch {
            expected: substitute_closed(param, bindings),
            actual: actual.clone(),
            context: argument_context(index, &sig.name),
            location: location.clone(),
        }),
        Err(MatchFailure::Conflict { parameter, bound, conflicting }) => {
            Err(TypeInferenceError::GenericBindingConflict {
                function: sig.name.clone(),
                parameter,
                bound,
                conflicting,
                location: location.clone(),
            })
        }
    }
}

/// Match an argument type against a parameter, binding generics on the way.
fn match_type(param: &UdmType, actual: &UdmType, bindings: &mut Bindings) -> std::result::Result<(), MatchFailure> {
    match (param, actual) {
        (UdmType::Generic(name), _) => {
            let refined = match bindings.get(name) {
                None => actual.clone(),
                Some(bound) => refine(bound, actual).ok_or_else(|| MatchFailure::Conflict {
                    parameter: name.clone(),
                    bound: bound.clone(),
                    conflicting: actual.clone(),
                })?,
            };
            bindings.insert(name.clone(), refined);
            Ok(())
        }
        (UdmType::Array(p), UdmType::Array(a)) => match_type(p, a, bindings),
        (UdmType::Array(p), UdmType::Any) if p.contains_generic() => match_type(p, &UdmType::Any, bindings),
        (UdmType::Function(p), UdmType::Function(a)) if p.params.len() == a.params.len() => {
            for (pp, ap) in p.params.iter().zip(&a.params) {
                match_type(pp, ap, bindings)?;
            }
            match_type(&p.return_type, &a.return_type, bindings)
        }
        (_, UdmType::Any) => Ok(()),
        _ if param.contains_generic() => {
            if is_subtype(actual, &substitute_closed(param, bindings)) {
                Ok(())
            } else {
                Err(MatchFailure::Mismatch)
            }
        }
        _ if is_subtype(actual, param) => Ok(()),
        _ => Err(MatchFailure::Mismatch),
    }
}

/// Refine an existing generic binding with a later observation.
///
/// Related types widen to the more general one and `Null` makes the binding
/// nullable; unrelated types conflict.
fn refine(bound: &UdmType, actual: &UdmType) -> Option<UdmType> {
    if matches!(actual, UdmType::Any) || is_subtype(actual, bound) {
        return Some(bound.clone());
    }
    if is_subtype(bound, actual) {
        return Some(actual.clone());
    }
    match (bound, actual) {
        (_, UdmType::Null) => Some(bound.make_nullable()),
        (UdmType::Null, _) => Some(actual.make_nullable()),
        _ if bound.is_nullable() || actual.is_nullable() => {
            refine(&bound.make_non_nullable(), &actual.make_non_nullable()).map(|t| t.make_nullable())
        }
        _ => None,
    }
}

fn argument_context(index: usize, function: &str) -> String {
    format!("argument {} of {function}", index + 1)
}

// ————————————————————————————————————————————————————————————————————————————
// OPERATORS & LITERALS
// ————————————————————————————————————————————————————————————————————————————

fn literal_type(lit: &Literal) -> UdmType {
    match lit {
        Literal::String(_) => UdmType::String,
        Literal::Integer(_) => UdmType::Integer,
        Literal::Number(_) => UdmType::Number,
        Literal::Boolean(_) => UdmType::Boolean,
        Literal::Null => UdmType::Null,
    }
}

fn is_boolean(t: &UdmType) -> bool {
    matches!(t, UdmType::Boolean | UdmType::Any)
}

fn is_numeric(t: &UdmType) -> bool {
    matches!(t, UdmType::Any) || is_subtype(t, &UdmType::Number)
}

fn element_of(operation: &str, ty: &UdmType, location: Option<SourceLocation>) -> Result<UdmType> {
    match ty {
        UdmType::Array(el) => Ok((**el).clone()),
        UdmType::Any => Ok(UdmType::Any),
        other => Err(TypeInferenceError::NonArrayCollection {
            operation: operation.to_string(),
            actual: other.clone(),
            location,
        }),
    }
}

fn unary_type(op: UnaryOp, ty: UdmType, location: Option<SourceLocation>) -> Result<UdmType> {
    match op {
        UnaryOp::Not if is_boolean(&ty) => Ok(UdmType::Boolean),
        UnaryOp::Not => Err(mismatch(UdmType::Boolean, ty, "operand of !", location)),
        UnaryOp::Neg if matches!(ty, UdmType::Integer) => Ok(UdmType::Integer),
        UnaryOp::Neg if is_numeric(&ty) => Ok(UdmType::Number),
        UnaryOp::Neg => Err(mismatch(UdmType::Number, ty, "operand of unary -", location)),
    }
}

fn binary_type(op: BinaryOp, l: UdmType, r: UdmType, location: Option<SourceLocation>) -> Result<UdmType> {
    if op.is_comparison() {
        return Ok(UdmType::Boolean);
    }
    if op.is_logical() {
        for (side, ty) in [("left", l), ("right", r)] {
            if !is_boolean(&ty) {
                let context = format!("{side} operand of {op}");
                return Err(mismatch(UdmType::Boolean, ty, &context, location));
            }
        }
        return Ok(UdmType::Boolean);
    }

    // string concatenation
    if op == BinaryOp::Add {
        let string_and_primitive = |a: &UdmType, b: &UdmType| matches!(a, UdmType::String) && b.is_primitive();
        if string_and_primitive(&l, &r) || string_and_primitive(&r, &l) {
            return Ok(UdmType::String);
        }
        if matches!(l, UdmType::Any) || matches!(r, UdmType::Any) {
            return Ok(UdmType::Any);
        }
    }
    for (side, ty) in [("left", &l), ("right", &r)] {
        if !is_numeric(ty) {
            let context = format!("{side} operand of {op}");
            return Err(mismatch(UdmType::Number, ty.clone(), &context, location));
        }
    }
    let integral = matches!((&l, &r), (UdmType::Integer, UdmType::Integer))
        && matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul);
    Ok(if integral { UdmType::Integer } else { UdmType::Number })
}

fn mismatch(expected: UdmType, actual: UdmType, context: &str, location: Option<SourceLocation>) -> TypeInferenceError {
    TypeInferenceError::TypeMismatch { expected, actual, context: context.to_string(), location }
}

/// Dotted rendering of a path-like expression, for error messages.
fn path_text(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Path { path } => path.clone(),
        ExprKind::Member { object, property } => format!("{}.{property}", path_text(object)),
        ExprKind::Call { name, .. } => format!("{name}(..)"),
        _ => "(..)".to_string(),
    }
}

// ------------------------------- Tests ------------------------------------ //
