//! Collection functions. Most are generic over the element type `T`; the
//! higher-order ones take a lambda whose result binds `R`.
use crate::types::UdmType;

use super::{FunctionSignature, array_of, lambda, r, t};

pub fn signatures() -> Vec<FunctionSignature> {
    use UdmType::{Any, Boolean, Integer, Number};
    vec![
        FunctionSignature::new("map", vec![array_of(t()), lambda(vec![t()], r())], array_of(r())),
        FunctionSignature::new("filter", vec![array_of(t()), lambda(vec![t()], Boolean)], array_of(t())),
        FunctionSignature::new(
            "reduce",
            vec![array_of(t()), lambda(vec![r(), t()], r()), r()],
            r(),
        )
        .describe("Fold with an initial accumulator"),
        FunctionSignature::new("sum", vec![array_of(Number)], Number),
        FunctionSignature::new("avg", vec![array_of(Number)], Number),
        FunctionSignature::new("count", vec![array_of(Any)], Integer),
        FunctionSignature::new("first", vec![array_of(t())], t().make_nullable()),
        FunctionSignature::new("last", vec![array_of(t())], t().make_nullable()),
        FunctionSignature::new("reverse", vec![array_of(t())], array_of(t())),
        FunctionSignature::new("sort", vec![array_of(t())], array_of(t())),
        FunctionSignature::new("sortBy", vec![array_of(t()), lambda(vec![t()], Any)], array_of(t())),
        FunctionSignature::new("groupBy", vec![array_of(t()), lambda(vec![t()], Any)], UdmType::open_object())
            .describe("Object keyed by the lambda result"),
        FunctionSignature::new("distinct", vec![array_of(t())], array_of(t())),
        FunctionSignature::new("flatten", vec![array_of(array_of(t()))], array_of(t())),
        FunctionSignature::new(
            "flatMap",
            vec![array_of(t()), lambda(vec![t()], array_of(r()))],
            array_of(r()),
        ),
        FunctionSignature::new("find", vec![array_of(t()), lambda(vec![t()], Boolean)], t().make_nullable()),
        FunctionSignature::new("some", vec![array_of(t()), lambda(vec![t()], Boolean)], Boolean),
        FunctionSignature::new("every", vec![array_of(t()), lambda(vec![t()], Boolean)], Boolean),
        FunctionSignature::new("take", vec![array_of(t()), Integer], array_of(t())),
        FunctionSignature::new("drop", vec![array_of(t()), Integer], array_of(t())),
        FunctionSignature::new("min", vec![array_of(Number)], Number.make_nullable()),
        FunctionSignature::new("max", vec![array_of(Number)], Number.make_nullable()),
        FunctionSignature::new("includes", vec![array_of(t()), t()], Boolean),
        FunctionSignature::new("append", vec![array_of(t()), t()], array_of(t())),
    ]
}
