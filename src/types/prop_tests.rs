//! Property tests for the type algebra using proptest.
//!
//! Laws that must hold for any type, not just hand-picked ones:
//!
//! 1. Subtype reflexivity and transitivity
//! 2. Merge idempotence for non-union types
//! 3. `make_non_nullable(make_nullable(t)) == t` for non-null `t`
//! 4. Substitution of a bare placeholder yields exactly the bound type

use proptest::prelude::*;

use super::algebra::{Bindings, is_subtype, merge, substitute, unify};
use super::{ObjectType, PropertyInfo, UdmType};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const LABEL_POOL: &[&str] = &["id", "name", "@sku", "qty", "price", "level"];

fn arb_primitive() -> impl Strategy<Value = UdmType> {
    prop_oneof![
        Just(UdmType::String),
        Just(UdmType::Number),
        Just(UdmType::Integer),
        Just(UdmType::Boolean),
        Just(UdmType::Null),
        Just(UdmType::Any),
    ]
}

fn arb_type() -> impl Strategy<Value = UdmType> {
    arb_primitive().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(UdmType::array),
            prop::collection::vec(inner.clone(), 2..4).prop_map(UdmType::union),
            (
                prop::collection::vec(
                    (prop::sample::select(LABEL_POOL), inner, any::<bool>()),
                    0..4,
                ),
                any::<bool>(),
            )
                .prop_map(|(fields, open)| {
                    UdmType::Object(ObjectType {
                        properties: fields
                            .into_iter()
                            .map(|(name, ty, required)| {
                                let prop = if required {
                                    PropertyInfo::required(ty)
                                } else {
                                    PropertyInfo::optional(ty)
                                };
                                (name.to_string(), prop)
                            })
                            .collect(),
                        additional_properties: open,
                    })
                }),
        ]
    })
}

fn is_union(t: &UdmType) -> bool {
    matches!(t, UdmType::Union(_))
}

// ---------------------------------------------------------------------------
// Laws
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn subtype_is_reflexive(t in arb_type()) {
        prop_assert!(is_subtype(&t, &t));
    }

    #[test]
    fn subtype_is_transitive(a in arb_type(), b in arb_type(), c in arb_type()) {
        if is_subtype(&a, &b) && is_subtype(&b, &c) {
            prop_assert!(is_subtype(&a, &c), "{a} <: {b} <: {c}");
        }
    }

    #[test]
    fn everything_is_below_any(t in arb_type()) {
        prop_assert!(is_subtype(&t, &UdmType::Any));
    }

    #[test]
    fn merge_is_idempotent(t in arb_type()) {
        prop_assume!(!is_union(&t));
        prop_assert_eq!(merge(&t, &t), t);
    }

    #[test]
    fn unify_covers_both_sides(a in arb_type(), b in arb_type()) {
        let u = unify(&a, &b);
        prop_assert!(is_subtype(&a, &u), "{a} not under {u}");
        prop_assert!(is_subtype(&b, &u), "{b} not under {u}");
    }

    #[test]
    fn nullable_round_trip(t in arb_type()) {
        prop_assume!(!t.is_nullable());
        prop_assert_eq!(t.make_nullable().make_non_nullable(), t);
    }

    #[test]
    fn substituting_a_placeholder_yields_the_binding(t in arb_type()) {
        let mut bindings = Bindings::new();
        bindings.insert("T".to_string(), t.clone());
        prop_assert_eq!(substitute(&UdmType::generic("T"), &bindings), t.clone());
        let nested = UdmType::function(
            vec![UdmType::array(UdmType::generic("T"))],
            UdmType::object([("value", PropertyInfo::required(UdmType::generic("T")))]),
        );
        prop_assert!(!substitute(&nested, &bindings).contains_generic());
    }
}
