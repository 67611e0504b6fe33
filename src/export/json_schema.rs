use serde_json::{Map, Value, json};

use crate::error::SchemaGenerationError;
use crate::export::SchemaFormat;
use crate::types::{ObjectType, UdmType};

/// Render a type as a JSON Schema fragment (no `$schema` header).
pub fn to_json_schema(ty: &UdmType) -> Result<Value, SchemaGenerationError> {
    let schema = match ty {
        UdmType::String => json!({"type": "string"}),
        UdmType::Number => json!({"type": "number"}),
        UdmType::Integer => json!({"type": "integer"}),
        UdmType::Boolean => json!({"type": "boolean"}),
        UdmType::Null => json!({"type": "null"}),
        UdmType::Any => json!({}),
        UdmType::Array(el) => json!({"type": "array", "items": to_json_schema(el)?}),
        UdmType::Object(obj) => emit_object(obj)?,
        UdmType::Union(members) => {
            let non_null: Vec<&UdmType> = members.iter().filter(|t| !matches!(t, UdmType::Null)).collect();
            match non_null.as_slice() {
                [base] if members.len() == 2 => emit_nullable(base)?,
                _ => {
                    let arms = members.iter().map(to_json_schema).collect::<Result<Vec<_>, _>>()?;
                    json!({"anyOf": arms})
                }
            }
        }
        UdmType::Function(_) | UdmType::Generic(_) => {
            return Err(SchemaGenerationError::UnsupportedTypeForFormat {
                ty: ty.clone(),
                format: SchemaFormat::JsonSchema,
                reason: "only data types have a schema".into(),
            });
        }
    };
    Ok(schema)
}

fn emit_object(obj: &ObjectType) -> Result<Value, SchemaGenerationError> {
    let mut props = Map::new();
    let mut required: Vec<Value> = Vec::new();
    for (name, prop) in &obj.properties {
        let mut schema = to_json_schema(&prop.ty)?;
        if let (Some(description), Value::Object(fields)) = (&prop.description, &mut schema) {
            fields.insert("description".into(), Value::from(description.clone()));
        }
        props.insert(name.clone(), schema);
        if !prop.is_optional() {
            required.push(Value::from(name.clone()));
        }
    }
    Ok(json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": obj.additional_properties,
    }))
}

/// `T | Null`: widen the `type` keyword when there is one to widen.
fn emit_nullable(base: &UdmType) -> Result<Value, SchemaGenerationError> {
    let mut schema = to_json_schema(base)?;
    let type_name = schema.get("type").and_then(Value::as_str).map(str::to_string);
    match type_name {
        Some(name) => {
            schema["type"] = json!([name, "null"]);
            Ok(schema)
        }
        None => Ok(json!({"anyOf": [schema, {"type": "null"}]})),
    }
}
