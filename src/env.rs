//! Path-keyed type environment.
//!
//! A root environment is filled once by a schema importer and is read-only
//! afterwards. Lambda and `let` bodies get a child scope holding a single
//! binding plus a borrowed link to the enclosing scope; the child never
//! outlives the inference call that created it.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::UdmType;

/// `name[0][1]` → (`name`, `[0][1]`)
static INDEXED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").expect("valid segment regex"));

#[derive(Debug, Clone, Default)]
pub struct TypeEnvironment<'p> {
    bindings: IndexMap<String, UdmType>,
    parent: Option<&'p TypeEnvironment<'p>>,
}

impl TypeEnvironment<'static> {
    /// Create an empty root environment.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'p> TypeEnvironment<'p> {
    /// Create a child scope with one binding that falls back to `self`.
    pub fn create_child(&self, name: impl Into<String>, ty: UdmType) -> TypeEnvironment<'_> {
        let mut bindings = IndexMap::with_capacity(1);
        bindings.insert(name.into(), ty);
        TypeEnvironment { bindings, parent: Some(self) }
    }

    /// Insert or overwrite the binding at an exact path.
    pub fn bind(&mut self, path: impl Into<String>, ty: UdmType) {
        self.bindings.insert(path.into(), ty);
    }

    /// Exact-path lookup, falling back to the parent scope.
    pub fn lookup(&self, path: &str) -> Option<&UdmType> {
        self.bindings
            .get(path)
            .or_else(|| self.parent.and_then(|p| p.lookup(path)))
    }

    /// Resolve a dotted path such as `input.Order.Items.Item.@sku`.
    ///
    /// The first segment is a binding; each later segment names an object
    /// property. Arrays are crossed transparently: a numeric segment (or a
    /// `[n]` suffix) selects the element type, a named segment is resolved
    /// against the element type. A nullable object is crossed too and the
    /// result stays nullable. Below `Any` every path is `Any`. Anything
    /// else ends the walk with `None`.
    pub fn lookup_nested(&self, path: &str) -> Option<UdmType> {
        if let Some(ty) = self.bindings.get(path) {
            return Some(ty.clone());
        }
        let mut segments = path.split('.');
        let head = segments.next()?;
        let (head_name, head_indexes) = split_segment(head)?;
        let Some(root) = self.bindings.get(head_name) else {
            return self.parent.and_then(|p| p.lookup_nested(path));
        };
        let mut current = index_into(root.clone(), head_indexes)?;
        for segment in segments {
            current = descend(&current, segment)?;
        }
        Some(current)
    }

    /// Bindings owned by this scope, in insertion order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &UdmType)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn parent(&self) -> Option<&TypeEnvironment<'p>> {
        self.parent
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Split `name[0][2]` into the name and the number of index suffixes.
fn split_segment(segment: &str) -> Option<(&str, usize)> {
    let caps = INDEXED_SEGMENT.captures(segment)?;
    let name = caps.get(1).map_or("", |m| m.as_str());
    let indexes = caps.get(2).map_or(0, |m| m.as_str().matches('[').count());
    Some((name, indexes))
}

fn index_into(mut current: UdmType, indexes: usize) -> Option<UdmType> {
    for _ in 0..indexes {
        current = match current {
            UdmType::Array(el) => *el,
            UdmType::Any => UdmType::Any,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve one segment (with optional `[n]` suffixes) against `current`.
pub(crate) fn descend(current: &UdmType, segment: &str) -> Option<UdmType> {
    let (name, indexes) = split_segment(segment)?;
    let resolved = if name.is_empty() {
        current.clone()
    } else {
        resolve_name(current, name)?
    };
    index_into(resolved, indexes)
}

fn resolve_name(current: &UdmType, name: &str) -> Option<UdmType> {
    match current {
        UdmType::Any => Some(UdmType::Any),
        UdmType::Object(obj) => obj.property(name).map(|p| p.ty.clone()),
        UdmType::Array(el) => {
            if name.bytes().all(|b| b.is_ascii_digit()) {
                Some((**el).clone())
            } else {
                resolve_name(el, name)
            }
        }
        UdmType::Union(members) if current.is_nullable() => {
            let mut non_null = members.iter().filter(|t| !matches!(t, UdmType::Null));
            let only = non_null.next()?;
            if non_null.next().is_some() {
                return None;
            }
            resolve_name(only, name).map(|t| t.make_nullable())
        }
        _ => None,
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyInfo;

    fn order_env() -> TypeEnvironment<'static> {
        let item = UdmType::object([
            ("@sku", PropertyInfo::required(UdmType::String)),
            ("@quantity", PropertyInfo::required(UdmType::Integer)),
        ]);
        let order = UdmType::object([
            ("@id", PropertyInfo::required(UdmType::String)),
            ("Items", PropertyInfo::required(UdmType::object([
                ("Item", PropertyInfo::required(UdmType::array(item))),
            ]))),
            ("Note", PropertyInfo::optional(UdmType::object([
                ("text", PropertyInfo::required(UdmType::String)),
            ]).make_nullable())),
        ]);
        let mut env = TypeEnvironment::new();
        env.bind("input", UdmType::object([("Order", PropertyInfo::required(order))]));
        env
    }

    #[test]
    fn exact_lookup() {
        let mut env = TypeEnvironment::new();
        env.bind("input.total", UdmType::Number);
        assert_eq!(env.lookup("input.total"), Some(&UdmType::Number));
        assert_eq!(env.lookup("input"), None);
        env.bind("input.total", UdmType::Integer);
        assert_eq!(env.lookup("input.total"), Some(&UdmType::Integer));
    }

    #[test]
    fn nested_lookup_walks_objects() {
        let env = order_env();
        assert_eq!(env.lookup_nested("input.Order.@id"), Some(UdmType::String));
        assert_eq!(env.lookup_nested("input.Order.missing"), None);
        assert_eq!(env.lookup_nested("input.Order.@id.deeper"), None);
    }

    #[test]
    fn nested_lookup_crosses_arrays() {
        let env = order_env();
        assert_eq!(env.lookup_nested("input.Order.Items.Item.@sku"), Some(UdmType::String));
        assert_eq!(env.lookup_nested("input.Order.Items.Item.0.@quantity"), Some(UdmType::Integer));
        assert_eq!(env.lookup_nested("input.Order.Items.Item[1].@quantity"), Some(UdmType::Integer));
        assert!(matches!(env.lookup_nested("input.Order.Items.Item"), Some(UdmType::Array(_))));
    }

    #[test]
    fn nested_lookup_keeps_nullability() {
        let env = order_env();
        assert_eq!(
            env.lookup_nested("input.Order.Note.text"),
            Some(UdmType::String.make_nullable())
        );
    }

    #[test]
    fn nested_lookup_below_any() {
        let mut env = TypeEnvironment::new();
        env.bind("input", UdmType::object([("meta", PropertyInfo::optional(UdmType::Any))]));
        assert_eq!(env.lookup_nested("input.meta.a.b"), Some(UdmType::Any));
        assert_eq!(env.lookup_nested("input.other"), None);
    }

    #[test]
    fn child_scope_falls_back_to_parent() {
        let env = order_env();
        let child = env.create_child("item", UdmType::object([
            ("@price", PropertyInfo::required(UdmType::Number)),
        ]));
        assert_eq!(child.lookup_nested("item.@price"), Some(UdmType::Number));
        assert_eq!(child.lookup_nested("input.Order.@id"), Some(UdmType::String));
        assert_eq!(child.len(), 1);
        assert!(env.lookup_nested("item.@price").is_none());
    }

    #[test]
    fn child_scope_shadows() {
        let env = order_env();
        let child = env.create_child("input", UdmType::Boolean);
        let grandchild = child.create_child("x", UdmType::Integer);
        assert_eq!(grandchild.lookup_nested("input"), Some(UdmType::Boolean));
        assert_eq!(grandchild.lookup_nested("x"), Some(UdmType::Integer));
        assert!(grandchild.lookup_nested("input.Order").is_none());
    }
}
