//! End-to-end runs: schema fixture → environment → inference → export.
use std::path::PathBuf;

use serde_json::json;
use udm_schema::ast::{Expr, SourceLocation};
use udm_schema::diff::diff_json;
use udm_schema::export::{RenderedDocument, xsd::DEFAULT_ROOT_NAME};
use udm_schema::import::SchemaKind;
use udm_schema::{
    FunctionRegistry, ParsedSchema, PropertyInfo, SchemaFormat, TypeEnvironment, TypeInferenceError, UdmType,
    build_type_environment, generate_schema, infer_expression_type, path_de,
};

fn fixture(name: &str) -> (PathBuf, String) {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    let source = std::fs::read_to_string(&path).unwrap();
    (path, source)
}

fn environment(name: &str) -> TypeEnvironment<'static> {
    let (path, source) = fixture(name);
    let schema = ParsedSchema::from_json_str(SchemaKind::from_path(&path), &source).unwrap();
    build_type_environment(&schema).unwrap()
}

fn transform(name: &str) -> Expr {
    path_de::from_str_with_path(&fixture(name).1).unwrap()
}

fn infer(schema: &str, expr: &str) -> Result<UdmType, TypeInferenceError> {
    let env = environment(schema);
    infer_expression_type(&transform(expr), &env, FunctionRegistry::standard())
}

#[test]
fn sum_of_line_products_is_a_number() {
    assert_eq!(infer("order.xsd.json", "sum_of_products.json"), Ok(UdmType::Number));
}

#[test]
fn summing_string_prices_fails_at_the_sum_call() {
    match infer("order_string_price.xsd.json", "sum_of_prices.json") {
        Err(TypeInferenceError::TypeMismatch { expected, actual, location, .. }) => {
            assert_eq!(expected, UdmType::array(UdmType::Number));
            assert_eq!(actual, UdmType::array(UdmType::String));
            assert_eq!(location, Some(SourceLocation::new(3, 7)));
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn number_result_exports_as_a_bare_number_schema() {
    let ty = infer("order.xsd.json", "sum_of_products.json").unwrap();
    let rendered = generate_schema(&ty, SchemaFormat::JsonSchema).unwrap();
    assert_eq!(rendered.document, RenderedDocument::Json(json!({"type": "number"})));
}

#[test]
fn diverging_branches_export_as_any_of() {
    let ty = infer("order.xsd.json", "loyalty.json").unwrap();
    let gold = UdmType::object([
        ("level", PropertyInfo::required(UdmType::String)),
        ("bonus", PropertyInfo::required(UdmType::Integer)),
    ]);
    let standard = UdmType::object([("level", PropertyInfo::required(UdmType::String))]);
    assert_eq!(ty, UdmType::union([gold, standard]));

    let rendered = generate_schema(&ty, SchemaFormat::JsonSchema).unwrap();
    let RenderedDocument::Json(schema) = &rendered.document else { panic!("expected JSON") };
    let expected = json!({"anyOf": [
        {
            "type": "object",
            "properties": {"level": {"type": "string"}, "bonus": {"type": "integer"}},
            "required": ["level", "bonus"],
            "additionalProperties": false
        },
        {
            "type": "object",
            "properties": {"level": {"type": "string"}},
            "required": ["level"],
            "additionalProperties": false
        }
    ]});
    assert!(diff_json(&expected, schema).is_empty(), "{schema:#}");

    let xsd = generate_schema(&ty, SchemaFormat::Xsd).unwrap();
    assert_eq!(xsd.warnings.len(), 1);
    assert!(xsd.to_text().contains(&format!(r#"<xs:element name="{DEFAULT_ROOT_NAME}" type="xs:anyType"/>"#)));
}

#[test]
fn mapping_a_scalar_fails_at_the_map() {
    match infer("order.xsd.json", "map_customer.json") {
        Err(TypeInferenceError::NonArrayCollection { actual, location, .. }) => {
            assert_eq!(actual, UdmType::String);
            assert_eq!(location, Some(SourceLocation::new(2, 1)));
        }
        other => panic!("expected NonArrayCollection, got {other:?}"),
    }
}

#[test]
fn json_schema_input_with_refs() {
    let env = environment("invoice.schema.json");
    assert_eq!(env.lookup("input.total"), Some(&UdmType::Number));
    assert_eq!(env.lookup_nested("input.lines.note"), Some(UdmType::String.make_nullable()));

    let ty = infer_expression_type(&transform("total.json"), &env, FunctionRegistry::standard()).unwrap();
    assert_eq!(ty, UdmType::Number);

    let amounts = Expr::call("sum", vec![Expr::map(Expr::path("input.lines"), "l", Expr::path("l.amount"))]);
    assert_eq!(infer_expression_type(&amounts, &env, FunctionRegistry::standard()), Ok(UdmType::Number));
}

#[test]
fn avro_input() {
    let env = environment("payment.avsc");
    assert_eq!(env.lookup("input.amount"), Some(&UdmType::Number));
    assert_eq!(env.lookup("input.refunds"), Some(&UdmType::array(UdmType::Integer)));
    assert_eq!(env.lookup("input.memo"), Some(&UdmType::String.make_nullable()));

    let refunded = Expr::call("sum", vec![Expr::path("input.refunds")]);
    let ty = infer_expression_type(&refunded, &env, FunctionRegistry::standard()).unwrap();
    assert!(udm_schema::types::is_subtype(&ty, &UdmType::Number), "{ty}");
}
