//! Subtyping, merge (⊔), unify and generic substitution over [`UdmType`].
//!
//! Every operation here is a pure function: inputs are borrowed, results
//! are fresh values.
use std::collections::BTreeMap;

use super::{FunctionType, ObjectType, PropertyInfo, UdmType};

/// Generic parameter name → concrete type, built per call site.
pub type Bindings = BTreeMap<String, UdmType>;

// ------------------------------- Subtyping -------------------------------- //

impl UdmType {
    /// `self <: other`: a value of `self` is usable wherever `other` is expected.
    pub fn is_subtype_of(&self, other: &UdmType) -> bool {
        is_subtype(self, other)
    }

    /// Add `Null` to the type.
    pub fn make_nullable(&self) -> UdmType {
        match self {
            UdmType::Null | UdmType::Any => self.clone(),
            other => UdmType::union([other.clone(), UdmType::Null]),
        }
    }

    /// Remove `Null` from a union. A lone survivor is unwrapped; if nothing
    /// but `Null` was there, `Null` is returned.
    pub fn make_non_nullable(&self) -> UdmType {
        match self {
            UdmType::Union(members) => UdmType::union(
                members.iter().filter(|t| !matches!(t, UdmType::Null)).cloned(),
            ),
            other => other.clone(),
        }
    }
}

pub fn is_subtype(a: &UdmType, b: &UdmType) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (_, UdmType::Any) => true,
        // every member of a union on the left must fit
        (UdmType::Union(members), _) => members.iter().all(|m| is_subtype(m, b)),
        // a union on the right accepts anything one of its members accepts
        (_, UdmType::Union(members)) => members.iter().any(|m| is_subtype(a, m)),
        (UdmType::Integer, UdmType::Number) => true,
        (UdmType::Array(x), UdmType::Array(y)) => is_subtype(x, y),
        (UdmType::Object(x), UdmType::Object(y)) => is_object_subtype(x, y),
        (UdmType::Function(x), UdmType::Function(y)) => is_function_subtype(x, y),
        _ => false,
    }
}

/// Width subtyping on objects.
///
/// Every property required by `b` must be required in `a` with a compatible
/// type. `a` may carry extra properties only when `b` is open.
fn is_object_subtype(a: &ObjectType, b: &ObjectType) -> bool {
    if !b.additional_properties {
        if a.additional_properties {
            return false;
        }
        if a.properties.keys().any(|k| !b.properties.contains_key(k)) {
            return false;
        }
    }
    b.properties
        .iter()
        .filter(|(_, pb)| !pb.is_optional())
        .all(|(name, pb)| match a.properties.get(name) {
            Some(pa) => !pa.is_optional() && is_subtype(&pa.ty, &pb.ty),
            None => false,
        })
}

fn is_function_subtype(a: &FunctionType, b: &FunctionType) -> bool {
    a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(pa, pb)| is_subtype(pb, pa))
        && is_subtype(&a.return_type, &b.return_type)
}

// -------------------------------- Merge (⊔) ------------------------------- //

/// Collect both types into one. `Any` absorbs everything.
pub fn merge(a: &UdmType, b: &UdmType) -> UdmType {
    if a == b {
        return a.clone();
    }
    if matches!(a, UdmType::Any) || matches!(b, UdmType::Any) {
        return UdmType::Any;
    }
    UdmType::union([a.clone(), b.clone()])
}

/// Combine two observed types into the most specific type covering both.
pub fn unify(a: &UdmType, b: &UdmType) -> UdmType {
    if is_subtype(a, b) {
        return b.clone();
    }
    if is_subtype(b, a) {
        return a.clone();
    }
    merge(a, b)
}

// ------------------------------ Substitution ------------------------------ //

/// Replace every bound `Generic` placeholder. Unbound placeholders stay.
pub fn substitute(ty: &UdmType, bindings: &Bindings) -> UdmType {
    match ty {
        UdmType::Generic(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        UdmType::Array(el) => UdmType::array(substitute(el, bindings)),
        UdmType::Object(obj) => UdmType::Object(ObjectType {
            properties: obj
                .properties
                .iter()
                .map(|(k, p)| {
                    (k.clone(), PropertyInfo { ty: substitute(&p.ty, bindings), ..p.clone() })
                })
                .collect(),
            additional_properties: obj.additional_properties,
        }),
        UdmType::Union(members) => {
            UdmType::union(members.iter().map(|t| substitute(t, bindings)))
        }
        UdmType::Function(f) => UdmType::function(
            f.params.iter().map(|p| substitute(p, bindings)).collect(),
            substitute(&f.return_type, bindings),
        ),
        UdmType::String | UdmType::Number | UdmType::Integer
        | UdmType::Boolean | UdmType::Null | UdmType::Any => ty.clone(),
    }
}

/// Substitute, then turn whatever placeholders are still unbound into `Any`.
pub fn substitute_closed(ty: &UdmType, bindings: &Bindings) -> UdmType {
    let substituted = substitute(ty, bindings);
    if !substituted.contains_generic() {
        return substituted;
    }
    let mut leftovers = Bindings::new();
    collect_generics(&substituted, &mut leftovers);
    substitute(&substituted, &leftovers)
}

fn collect_generics(ty: &UdmType, out: &mut Bindings) {
    match ty {
        UdmType::Generic(name) => {
            out.insert(name.clone(), UdmType::Any);
        }
        UdmType::Array(el) => collect_generics(el, out),
        UdmType::Object(obj) => {
            for p in obj.properties.values() { collect_generics(&p.ty, out); }
        }
        UdmType::Union(members) => {
            for t in members { collect_generics(t, out); }
        }
        UdmType::Function(f) => {
            for p in &f.params { collect_generics(p, out); }
            collect_generics(&f.return_type, out);
        }
        _ => {}
    }
}

// ------------------------------- Tests ------------------------------------ //
