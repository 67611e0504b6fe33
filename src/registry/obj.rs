use crate::types::UdmType;

use super::{FunctionSignature, array_of};

pub fn signatures() -> Vec<FunctionSignature> {
    use UdmType::{Any, Boolean, String};
    let any_object = UdmType::open_object;
    vec![
        FunctionSignature::new("keys", vec![any_object()], array_of(String)),
        FunctionSignature::new("values", vec![any_object()], array_of(Any)),
        FunctionSignature::new(
            "entries",
            vec![any_object()],
            array_of(UdmType::object([
                ("key", crate::types::PropertyInfo::required(String)),
                ("value", crate::types::PropertyInfo::required(Any)),
            ])),
        ),
        FunctionSignature::new("hasKey", vec![any_object(), String], Boolean),
        FunctionSignature::new("merge", vec![any_object(), any_object()], any_object())
            .describe("Shallow merge; keys of the second object win"),
    ]
}
