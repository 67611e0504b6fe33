use crate::types::UdmType;

use super::FunctionSignature;

pub fn signatures() -> Vec<FunctionSignature> {
    use UdmType::{Any, Integer, Number, String};
    vec![
        FunctionSignature::new("abs", vec![Number], Number),
        FunctionSignature::new("round", vec![Number, Integer], Number)
            .with_min_args(1)
            .describe("Round half away from zero, optionally to a number of decimals"),
        FunctionSignature::new("floor", vec![Number], Integer),
        FunctionSignature::new("ceil", vec![Number], Integer),
        FunctionSignature::new("sqrt", vec![Number], Number),
        FunctionSignature::new("pow", vec![Number, Number], Number),
        FunctionSignature::new("toNumber", vec![Any], Number),
        FunctionSignature::new("parseInt", vec![String], Integer),
        FunctionSignature::new("random", vec![], Number),
    ]
}
