use crate::types::UdmType;

use super::{FunctionSignature, array_of};

pub fn signatures() -> Vec<FunctionSignature> {
    use UdmType::{Any, Boolean, Integer, Number, String};
    vec![
        FunctionSignature::new("upper", vec![String], String).describe("Upper-case a string"),
        FunctionSignature::new("lower", vec![String], String).describe("Lower-case a string"),
        FunctionSignature::new("trim", vec![String], String),
        FunctionSignature::new("capitalize", vec![String], String),
        FunctionSignature::new("length", vec![String], Integer),
        FunctionSignature::new("substring", vec![String, Integer, Integer], String)
            .with_min_args(2)
            .describe("Characters from start up to (excluding) end"),
        FunctionSignature::new("concat", vec![Any], String)
            .with_min_args(1)
            .variadic()
            .describe("String concatenation of every argument"),
        FunctionSignature::new("contains", vec![String, String], Boolean),
        FunctionSignature::new("startsWith", vec![String, String], Boolean),
        FunctionSignature::new("endsWith", vec![String, String], Boolean),
        FunctionSignature::new("replace", vec![String, String, String], String),
        FunctionSignature::new("split", vec![String, String], array_of(String)),
        FunctionSignature::new("join", vec![array_of(Any), String], String).with_min_args(1),
        FunctionSignature::new("matches", vec![String, String], Boolean)
            .describe("Regular-expression test"),
        FunctionSignature::new("padLeft", vec![String, Integer, String], String).with_min_args(2),
        FunctionSignature::new("toString", vec![Any], String),
        FunctionSignature::new("formatDate", vec![String, String], String),
        FunctionSignature::new("parseDate", vec![String, String], String).with_min_args(1),
        FunctionSignature::new("now", vec![], String).describe("Current timestamp, ISO 8601"),
        FunctionSignature::new("formatNumber", vec![Number, String], String),
    ]
}
