//! Structural type model for UDM documents.
//!
//! A [`UdmType`] describes the *shape* a value may take, never a value
//! itself. Types are immutable once built: every algebra operation in
//! [`algebra`] returns a fresh type instead of editing one in place.
//!
//! - Unions are sets. They are only built through [`UdmType::union`], which
//!   flattens nested unions and drops duplicates, so a union never directly
//!   contains another union.
//! - Object equality ignores property order.
//! - `Generic` placeholders only live inside function signatures; the
//!   inference engine substitutes them away before handing a type back.
pub mod algebra;
#[cfg(test)]
mod prop_tests;

use std::fmt;
use indexmap::IndexMap;

pub use algebra::{Bindings, is_subtype, merge, substitute, substitute_closed, unify};

/// `maxOccurs` value meaning "no upper bound".
pub const UNBOUNDED: i32 = -1;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum UdmType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Any,
    Array(Box<UdmType>),
    Object(ObjectType),
    Union(UnionType),
    Generic(String),
    Function(FunctionType),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectType {
    pub properties: IndexMap<String, PropertyInfo>,
    pub additional_properties: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub params: Vec<UdmType>,
    pub return_type: Box<UdmType>,
}

/// Members of a union, flattened and free of duplicates.
///
/// Insertion order is kept for stable rendering; equality is set equality.
#[derive(Debug, Clone)]
pub struct UnionType(Vec<UdmType>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub ty: UdmType,
    pub required: bool,
    pub min_occurs: u32,
    /// [`UNBOUNDED`] for no upper bound.
    pub max_occurs: i32,
    pub description: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl UdmType {
    pub fn array(element: UdmType) -> Self {
        UdmType::Array(Box::new(element))
    }

    pub fn generic(name: impl Into<String>) -> Self {
        UdmType::Generic(name.into())
    }

    pub fn function(params: Vec<UdmType>, return_type: UdmType) -> Self {
        UdmType::Function(FunctionType { params, return_type: Box::new(return_type) })
    }

    /// Closed object (`additionalProperties = false`).
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyInfo)>,
        K: Into<String>,
    {
        UdmType::Object(ObjectType {
            properties: properties.into_iter().map(|(k, p)| (k.into(), p)).collect(),
            additional_properties: false,
        })
    }

    /// Object that accepts any property.
    pub fn open_object() -> Self {
        UdmType::Object(ObjectType { properties: IndexMap::new(), additional_properties: true })
    }

    /// Build a union, flattening nested unions and dropping duplicates.
    ///
    /// A single surviving member is returned as-is; with no members at all
    /// only `Null` remains.
    pub fn union<I>(members: I) -> Self
    where
        I: IntoIterator<Item = UdmType>,
    {
        let mut flat: Vec<UdmType> = Vec::new();
        for member in members {
            match member {
                UdmType::Union(inner) => {
                    for t in inner.0 {
                        if !flat.contains(&t) { flat.push(t); }
                    }
                }
                other => {
                    if !flat.contains(&other) { flat.push(other); }
                }
            }
        }
        match flat.len() {
            0 => UdmType::Null,
            1 => flat.remove(0),
            _ => UdmType::Union(UnionType(flat)),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            UdmType::String | UdmType::Number | UdmType::Integer
                | UdmType::Boolean | UdmType::Null | UdmType::Any
        )
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            UdmType::Null | UdmType::Any => true,
            UdmType::Union(u) => u.contains(&UdmType::Null),
            _ => false,
        }
    }

    /// True if a `Generic` placeholder appears anywhere inside.
    pub fn contains_generic(&self) -> bool {
        match self {
            UdmType::Generic(_) => true,
            UdmType::Array(el) => el.contains_generic(),
            UdmType::Object(obj) => obj.properties.values().any(|p| p.ty.contains_generic()),
            UdmType::Union(u) => u.iter().any(UdmType::contains_generic),
            UdmType::Function(f) => {
                f.params.iter().any(UdmType::contains_generic) || f.return_type.contains_generic()
            }
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            UdmType::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&UdmType> {
        match self {
            UdmType::Array(el) => Some(el),
            _ => None,
        }
    }
}

impl ObjectType {
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.get(name)
    }
}

impl UnionType {
    pub fn iter(&self) -> std::slice::Iter<'_, UdmType> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn contains(&self, ty: &UdmType) -> bool {
        self.0.contains(ty)
    }
}

impl<'a> IntoIterator for &'a UnionType {
    type Item = &'a UdmType;
    type IntoIter = std::slice::Iter<'a, UdmType>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PropertyInfo {
    pub fn required(ty: UdmType) -> Self {
        let max_occurs = if matches!(ty, UdmType::Array(_)) { UNBOUNDED } else { 1 };
        Self { ty, required: true, min_occurs: 1, max_occurs, description: None }
    }

    pub fn optional(ty: UdmType) -> Self {
        Self { required: false, min_occurs: 0, ..Self::required(ty) }
    }

    pub fn with_occurs(mut self, min_occurs: u32, max_occurs: i32) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn is_optional(&self) -> bool {
        !self.required || self.min_occurs == 0
    }

    pub fn is_array(&self) -> bool {
        self.max_occurs < 0 || self.max_occurs > 1
    }
}

// ————————————————————————————————————————————————————————————————————————————
// EQUALITY
// ————————————————————————————————————————————————————————————————————————————

impl PartialEq for UdmType {
    fn eq(&self, other: &Self) -> bool {
        use UdmType::*;
        match (self, other) {
            (String, String) | (Number, Number) | (Integer, Integer)
            | (Boolean, Boolean) | (Null, Null) | (Any, Any) => true,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Union(a), Union(b)) => a == b,
            (Generic(a), Generic(b)) => a == b,
            (Function(a), Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for UdmType {}

impl PartialEq for UnionType {
    fn eq(&self, other: &Self) -> bool {
        // members are deduplicated on construction
        self.0.len() == other.0.len() && self.0.iter().all(|t| other.0.contains(t))
    }
}

impl Eq for UnionType {}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for UdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UdmType::String => f.write_str("String"),
            UdmType::Number => f.write_str("Number"),
            UdmType::Integer => f.write_str("Integer"),
            UdmType::Boolean => f.write_str("Boolean"),
            UdmType::Null => f.write_str("Null"),
            UdmType::Any => f.write_str("Any"),
            UdmType::Generic(name) => f.write_str(name),
            UdmType::Array(el) => write!(f, "Array<{el}>"),
            UdmType::Object(obj) => {
                f.write_str("{")?;
                for (i, (name, prop)) in obj.properties.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    let marker = if prop.is_optional() { "?" } else { "" };
                    write!(f, "{name}{marker}: {}", prop.ty)?;
                }
                if obj.additional_properties {
                    if !obj.properties.is_empty() { f.write_str(", ")?; }
                    f.write_str("...")?;
                }
                f.write_str("}")
            }
            UdmType::Union(u) => {
                for (i, t) in u.iter().enumerate() {
                    if i > 0 { f.write_str(" | ")?; }
                    if matches!(t, UdmType::Function(_)) {
                        write!(f, "({t})")?;
                    } else {
                        write!(f, "{t}")?;
                    }
                }
                Ok(())
            }
            UdmType::Function(func) => {
                f.write_str("(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {}", func.return_type)
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedups() {
        let inner = UdmType::union([UdmType::String, UdmType::Integer]);
        let outer = UdmType::union([inner, UdmType::String, UdmType::Null]);
        match &outer {
            UdmType::Union(u) => {
                assert_eq!(u.len(), 3);
                assert!(u.iter().all(|t| !matches!(t, UdmType::Union(_))));
            }
            other => panic!("expected union, got {other}"),
        }
    }

    #[test]
    fn union_equality_ignores_order() {
        let a = UdmType::union([UdmType::String, UdmType::Number]);
        let b = UdmType::union([UdmType::Number, UdmType::String]);
        assert_eq!(a, b);
    }

    #[test]
    fn single_member_union_collapses() {
        assert_eq!(UdmType::union([UdmType::Boolean, UdmType::Boolean]), UdmType::Boolean);
    }

    #[test]
    fn object_equality_ignores_property_order() {
        let a = UdmType::object([
            ("x", PropertyInfo::required(UdmType::Integer)),
            ("y", PropertyInfo::optional(UdmType::String)),
        ]);
        let b = UdmType::object([
            ("y", PropertyInfo::optional(UdmType::String)),
            ("x", PropertyInfo::required(UdmType::Integer)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn property_predicates() {
        let p = PropertyInfo::required(UdmType::array(UdmType::String));
        assert!(p.is_array());
        assert!(!p.is_optional());
        let q = PropertyInfo::required(UdmType::String).with_occurs(0, 1);
        assert!(q.is_optional());
        assert!(!q.is_array());
    }

    #[test]
    fn display_renders_nested_types() {
        let t = UdmType::array(UdmType::object([
            ("@sku", PropertyInfo::required(UdmType::String)),
            ("note", PropertyInfo::optional(UdmType::union([UdmType::String, UdmType::Null]))),
        ]));
        assert_eq!(t.to_string(), "Array<{@sku: String, note?: String | Null}>");
        let f = UdmType::function(vec![UdmType::generic("T")], UdmType::Boolean);
        assert_eq!(f.to_string(), "(T) -> Boolean");
        assert_eq!(UdmType::open_object().to_string(), "{...}");
    }
}
