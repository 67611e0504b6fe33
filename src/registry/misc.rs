use crate::types::UdmType;

use super::{FunctionSignature, t};

pub fn signatures() -> Vec<FunctionSignature> {
    use UdmType::{Any, Boolean, String};
    vec![
        FunctionSignature::new("typeOf", vec![Any], String),
        FunctionSignature::new("isNull", vec![Any], Boolean),
        FunctionSignature::new("isEmpty", vec![Any], Boolean),
        FunctionSignature::new("coalesce", vec![t()], t())
            .with_min_args(1)
            .variadic()
            .describe("First non-null argument"),
    ]
}
