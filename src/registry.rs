//! Standard-library function signatures.
//!
//! The registry is immutable once built. The standard library is built
//! lazily on first use and shared; hosts with extra functions build their
//! own table with [`FunctionRegistry::extended_with`].
pub mod text;
pub mod num;
pub mod arr;
pub mod obj;
pub mod misc;

use std::fmt;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::types::UdmType;

static STANDARD_LIBRARY: Lazy<FunctionRegistry> = Lazy::new(|| {
    FunctionRegistry::from_signatures(
        text::signatures()
            .into_iter()
            .chain(num::signatures())
            .chain(arr::signatures())
            .chain(obj::signatures())
            .chain(misc::signatures()),
    )
});

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<UdmType>,
    pub return_type: UdmType,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
    /// The last parameter type repeats for every extra argument.
    pub varargs: bool,
    pub description: String,
}

impl FunctionSignature {
    /// Fixed-arity signature: every parameter is required.
    pub fn new(name: impl Into<String>, params: Vec<UdmType>, return_type: UdmType) -> Self {
        let arity = params.len();
        Self {
            name: name.into(),
            params,
            return_type,
            min_args: arity,
            max_args: Some(arity),
            varargs: false,
            description: String::new(),
        }
    }

    /// Parameters from position `min_args` onwards may be omitted.
    pub fn with_min_args(mut self, min_args: usize) -> Self {
        self.min_args = min_args;
        self
    }

    /// The last parameter may be repeated any number of times.
    pub fn variadic(mut self) -> Self {
        self.varargs = true;
        self.max_args = None;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Parameter type for the argument at `index`, repeating the last one
    /// for variadic functions.
    pub fn param_at(&self, index: usize) -> Option<&UdmType> {
        match self.params.get(index) {
            Some(p) => Some(p),
            None if self.varargs => self.params.last(),
            None => None,
        }
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    pub fn is_generic(&self) -> bool {
        self.params.iter().any(UdmType::contains_generic) || self.return_type.contains_generic()
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            write!(f, "{p}")?;
            if i >= self.min_args { f.write_str("?")?; }
        }
        if self.varargs { f.write_str("...")?; }
        write!(f, ") -> {}", self.return_type)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, FunctionSignature>,
}

impl FunctionRegistry {
    /// The shared standard library.
    pub fn standard() -> &'static FunctionRegistry {
        &STANDARD_LIBRARY
    }

    pub fn from_signatures<I>(signatures: I) -> Self
    where
        I: IntoIterator<Item = FunctionSignature>,
    {
        Self {
            functions: signatures.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// A new registry holding these signatures plus `extra` (which wins on
    /// name clashes).
    pub fn extended_with<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = FunctionSignature>,
    {
        let mut functions = self.functions.clone();
        for sig in extra {
            functions.insert(sig.name.clone(), sig);
        }
        Self { functions }
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// ------------------------------- Shorthands ------------------------------- //

pub(crate) fn t() -> UdmType {
    UdmType::generic("T")
}

pub(crate) fn r() -> UdmType {
    UdmType::generic("R")
}

pub(crate) fn array_of(el: UdmType) -> UdmType {
    UdmType::array(el)
}

pub(crate) fn lambda(params: Vec<UdmType>, ret: UdmType) -> UdmType {
    UdmType::function(params, ret)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_library_is_populated() {
        let reg = FunctionRegistry::standard();
        for name in ["upper", "abs", "map", "filter", "reduce", "sum", "groupBy", "keys", "coalesce"] {
            assert!(reg.lookup(name).is_some(), "missing {name}");
        }
        assert!(reg.lookup("noSuchFunction").is_none());
    }

    #[test]
    fn names_are_unique_across_modules() {
        let total = text::signatures().len()
            + num::signatures().len()
            + arr::signatures().len()
            + obj::signatures().len()
            + misc::signatures().len();
        assert_eq!(FunctionRegistry::standard().len(), total);
    }

    #[test]
    fn map_is_generic() {
        let map = FunctionRegistry::standard().lookup("map").unwrap();
        assert!(map.is_generic());
        assert_eq!(map.to_string(), "map(Array<T>, (T) -> R) -> Array<R>");
    }

    #[test]
    fn arity_rules() {
        let reg = FunctionRegistry::standard();
        let substring = reg.lookup("substring").unwrap();
        assert!(!substring.accepts_arity(1));
        assert!(substring.accepts_arity(2));
        assert!(substring.accepts_arity(3));
        assert!(!substring.accepts_arity(4));

        let concat = reg.lookup("concat").unwrap();
        assert!(concat.varargs);
        assert!(concat.accepts_arity(7));
        assert_eq!(concat.param_at(6), concat.params.last());
    }

    #[test]
    fn extension_does_not_touch_the_original() {
        let base = FunctionRegistry::standard();
        let ext = base.extended_with([FunctionSignature::new(
            "upper",
            vec![UdmType::String],
            UdmType::Integer,
        )]);
        assert_eq!(ext.lookup("upper").unwrap().return_type, UdmType::Integer);
        assert_eq!(base.lookup("upper").unwrap().return_type, UdmType::String);
        assert_eq!(ext.len(), base.len());
    }
}
