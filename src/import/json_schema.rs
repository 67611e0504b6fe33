//! JSON Schema → [`UdmType`].
//!
//! Handles draft-04 through 2020-12 shapes: `type` (string or array),
//! `properties`/`required`/`additionalProperties`, `items` (schema or
//! tuple), `prefixItems`, `enum`, `const`, `oneOf`/`anyOf`/`allOf`, OpenAPI
//! `nullable` and local `$ref` pointers.
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::types::{ObjectType, PropertyInfo, UdmType, unify};

pub fn import(schema: &Value) -> Result<UdmType, ImportError> {
    Converter { root: schema, resolving: Vec::new() }.convert(schema, "#")
}

struct Converter<'a> {
    root: &'a Value,
    /// `$ref` targets currently being expanded.
    resolving: Vec<String>,
}

impl<'a> Converter<'a> {
    fn convert(&mut self, node: &'a Value, path: &str) -> Result<UdmType, ImportError> {
        let obj = match node {
            Value::Bool(true) => return Ok(UdmType::Any),
            Value::Bool(false) => {
                return Err(ImportError::Unsupported {
                    path: path.to_string(),
                    message: "the `false` schema admits no value".into(),
                });
            }
            Value::Object(obj) => obj,
            other => {
                return Err(ImportError::Malformed {
                    path: path.to_string(),
                    message: format!("expected a schema object, found {other}"),
                });
            }
        };

        let ty = if let Some(reference) = obj.get("$ref") {
            self.convert_ref(reference, path)?
        } else {
            self.convert_inline(obj, path)?
        };

        if obj.get("nullable").and_then(Value::as_bool) == Some(true) {
            return Ok(ty.make_nullable());
        }
        Ok(ty)
    }

    fn convert_ref(&mut self, reference: &Value, path: &str) -> Result<UdmType, ImportError> {
        let Some(reference) = reference.as_str() else {
            return Err(ImportError::Malformed {
                path: format!("{path}/$ref"),
                message: "`$ref` must be a string".into(),
            });
        };
        let Some(pointer) = reference.strip_prefix('#') else {
            return Err(ImportError::UnresolvedReference { reference: reference.to_string() });
        };
        if self.resolving.iter().any(|r| r == reference) {
            warn!(reference, "recursive $ref");
            return Err(ImportError::RecursiveReference { reference: reference.to_string() });
        }
        let target = self
            .root
            .pointer(pointer)
            .ok_or_else(|| ImportError::UnresolvedReference { reference: reference.to_string() })?;
        debug!(reference, "resolving $ref");
        self.resolving.push(reference.to_string());
        let resolved = self.convert(target, reference);
        self.resolving.pop();
        resolved
    }

    fn convert_inline(&mut self, obj: &'a Map<String, Value>, path: &str) -> Result<UdmType, ImportError> {
        if let Some(value) = obj.get("const") {
            return Ok(value_type(value));
        }
        if let Some(values) = obj.get("enum") {
            let Some(values) = values.as_array() else {
                return Err(ImportError::Malformed {
                    path: format!("{path}/enum"),
                    message: "`enum` must be an array".into(),
                });
            };
            if values.is_empty() {
                return Err(ImportError::Unsupported {
                    path: format!("{path}/enum"),
                    message: "an empty `enum` admits no value".into(),
                });
            }
            return Ok(UdmType::union(values.iter().map(value_type)));
        }

        // keywords next to a combinator constrain every branch
        let own = self.convert_typed(obj, path)?;
        let base = match obj.get("allOf") {
            Some(branches) => {
                let members = self.convert_branches(branches, &format!("{path}/allOf"))?;
                members.iter().fold(own, |acc, next| merge_all_of(&acc, next))
            }
            None => own,
        };
        for keyword in ["oneOf", "anyOf"] {
            if let Some(branches) = obj.get(keyword) {
                let members = self.convert_branches(branches, &format!("{path}/{keyword}"))?;
                return Ok(UdmType::union(members.iter().map(|m| merge_all_of(&base, m))));
            }
        }
        Ok(base)
    }

    /// The schema's own `type` and structural keywords, combinators aside.
    fn convert_typed(&mut self, obj: &'a Map<String, Value>, path: &str) -> Result<UdmType, ImportError> {
        match obj.get("type") {
            Some(Value::String(name)) => self.convert_named(name, obj, path),
            Some(Value::Array(names)) => {
                let mut members = Vec::with_capacity(names.len());
                for name in names {
                    let Some(name) = name.as_str() else {
                        return Err(ImportError::Malformed {
                            path: format!("{path}/type"),
                            message: format!("type names must be strings, found {name}"),
                        });
                    };
                    members.push(self.convert_named(name, obj, path)?);
                }
                Ok(UdmType::union(members))
            }
            Some(other) => Err(ImportError::Malformed {
                path: format!("{path}/type"),
                message: format!("unexpected `type` value {other}"),
            }),
            // untyped: infer from the structural keywords present
            None if obj.contains_key("properties") || obj.contains_key("required") => self.convert_object(obj, path),
            None if obj.contains_key("items") || obj.contains_key("prefixItems") => self.convert_array(obj, path),
            None => Ok(UdmType::Any),
        }
    }

    fn convert_branches(&mut self, branches: &'a Value, path: &str) -> Result<Vec<UdmType>, ImportError> {
        let Some(branches) = branches.as_array() else {
            return Err(ImportError::Malformed { path: path.to_string(), message: "expected an array of schemas".into() });
        };
        branches
            .iter()
            .enumerate()
            .map(|(i, b)| self.convert(b, &format!("{path}/{i}")))
            .collect()
    }

    fn convert_named(&mut self, name: &str, obj: &'a Map<String, Value>, path: &str) -> Result<UdmType, ImportError> {
        match name {
            "string" => Ok(UdmType::String),
            "integer" => Ok(UdmType::Integer),
            "number" => Ok(UdmType::Number),
            "boolean" => Ok(UdmType::Boolean),
            "null" => Ok(UdmType::Null),
            "array" => self.convert_array(obj, path),
            "object" => self.convert_object(obj, path),
            other => Err(ImportError::UnknownType { name: other.to_string() }),
        }
    }

    fn convert_object(&mut self, obj: &'a Map<String, Value>, path: &str) -> Result<UdmType, ImportError> {
        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut out = ObjectType {
            properties: Default::default(),
            additional_properties: obj.get("additionalProperties") != Some(&Value::Bool(false)),
        };
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (name, schema) in props {
                let ty = self.convert(schema, &format!("{path}/properties/{name}"))?;
                let prop = if required.contains(&name.as_str()) {
                    PropertyInfo::required(ty)
                } else {
                    PropertyInfo::optional(ty)
                };
                let description = schema.get("description").and_then(Value::as_str).map(str::to_string);
                out.properties.insert(name.clone(), prop.with_description(description));
            }
        }
        // required names without a declared schema
        for name in required {
            if !out.properties.contains_key(name) {
                out.properties.insert(name.to_string(), PropertyInfo::required(UdmType::Any));
            }
        }
        Ok(UdmType::Object(out))
    }

    fn convert_array(&mut self, obj: &'a Map<String, Value>, path: &str) -> Result<UdmType, ImportError> {
        let mut positions = Vec::new();
        if let Some(Value::Array(prefix)) = obj.get("prefixItems") {
            for (i, schema) in prefix.iter().enumerate() {
                positions.push(self.convert(schema, &format!("{path}/prefixItems/{i}"))?);
            }
        }
        match obj.get("items") {
            // draft-04 tuple form
            Some(Value::Array(tuple)) => {
                for (i, schema) in tuple.iter().enumerate() {
                    positions.push(self.convert(schema, &format!("{path}/items/{i}"))?);
                }
            }
            Some(Value::Bool(false)) | None => {}
            Some(schema) => positions.push(self.convert(schema, &format!("{path}/items"))?),
        }
        let element = positions
            .into_iter()
            .reduce(|acc, next| unify(&acc, &next))
            .unwrap_or(UdmType::Any);
        Ok(UdmType::array(element))
    }
}

/// Type of a literal `enum`/`const` value.
fn value_type(value: &Value) -> UdmType {
    match value {
        Value::Null => UdmType::Null,
        Value::Bool(_) => UdmType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => UdmType::Integer,
        Value::Number(_) => UdmType::Number,
        Value::String(_) => UdmType::String,
        Value::Array(items) => {
            let element = items.iter().map(value_type).reduce(|a, b| unify(&a, &b));
            UdmType::array(element.unwrap_or(UdmType::Any))
        }
        Value::Object(_) => UdmType::open_object(),
    }
}

/// Combine two `allOf` branches.
///
/// Object branches pool their properties: requiredness is OR-ed and types of
/// shared keys are unified. A branch that constrains nothing (`Any`) yields
/// to the other side. Objects stay open only when both branches are open.
fn merge_all_of(a: &UdmType, b: &UdmType) -> UdmType {
    match (a, b) {
        (UdmType::Any, other) | (other, UdmType::Any) => other.clone(),
        (UdmType::Object(x), UdmType::Object(y)) => {
            let mut out = x.clone();
            out.additional_properties = x.additional_properties && y.additional_properties;
            for (name, py) in &y.properties {
                match out.properties.get_mut(name) {
                    Some(px) => {
                        px.ty = merge_all_of(&px.ty, &py.ty);
                        if py.required {
                            px.required = true;
                            px.min_occurs = px.min_occurs.max(py.min_occurs).max(1);
                        }
                        if px.description.is_none() {
                            px.description = py.description.clone();
                        }
                    }
                    None => {
                        out.properties.insert(name.clone(), py.clone());
                    }
                }
            }
            UdmType::Object(out)
        }
        _ => unify(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_of(ty: &UdmType) -> &ObjectType {
        ty.as_object().expect("object type")
    }

    #[test]
    fn primitives_and_objects() {
        let ty = import(&json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "order id"},
                "qty": {"type": "integer"},
                "price": {"type": "number"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["id", "qty"],
            "additionalProperties": false
        }))
        .unwrap();
        let obj = object_of(&ty);
        assert!(!obj.additional_properties);
        assert_eq!(obj.property("id").unwrap().description.as_deref(), Some("order id"));
        assert!(obj.property("qty").unwrap().required);
        assert!(obj.property("price").unwrap().is_optional());
        let tags = obj.property("tags").unwrap();
        assert_eq!(tags.ty, UdmType::array(UdmType::String));
        assert!(tags.is_array());
    }

    #[test]
    fn missing_additional_properties_means_open() {
        let ty = import(&json!({"type": "object", "properties": {}})).unwrap();
        assert!(object_of(&ty).additional_properties);
    }

    #[test]
    fn type_arrays_and_nullable() {
        assert_eq!(
            import(&json!({"type": ["string", "null"]})).unwrap(),
            UdmType::String.make_nullable()
        );
        assert_eq!(
            import(&json!({"type": "integer", "nullable": true})).unwrap(),
            UdmType::Integer.make_nullable()
        );
    }

    #[test]
    fn enum_and_const() {
        assert_eq!(import(&json!({"enum": ["a", "b"]})).unwrap(), UdmType::String);
        assert_eq!(
            import(&json!({"enum": ["a", null]})).unwrap(),
            UdmType::String.make_nullable()
        );
        assert_eq!(import(&json!({"const": 3})).unwrap(), UdmType::Integer);
    }

    #[test]
    fn one_of_builds_a_union() {
        let ty = import(&json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})).unwrap();
        assert_eq!(ty, UdmType::union([UdmType::String, UdmType::Integer]));
    }

    #[test]
    fn all_of_merges_three_branches() {
        let ty = import(&json!({"allOf": [
            {"type": "object", "properties": {"a": {"type": "integer"}}},
            {"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "string"}}, "required": ["b"]},
            {"required": ["a"]}
        ]}))
        .unwrap();
        let obj = object_of(&ty);
        let a = obj.property("a").unwrap();
        assert_eq!(a.ty, UdmType::Number);
        assert!(a.required);
        assert!(obj.property("b").unwrap().required);
    }

    #[test]
    fn tuples_unify_their_positions() {
        let ty = import(&json!({"type": "array", "prefixItems": [{"type": "integer"}, {"type": "number"}]})).unwrap();
        assert_eq!(ty, UdmType::array(UdmType::Number));
        let ty = import(&json!({"type": "array"})).unwrap();
        assert_eq!(ty, UdmType::array(UdmType::Any));
    }

    #[test]
    fn local_refs_resolve() {
        let ty = import(&json!({
            "$defs": {"Money": {"type": "number"}},
            "type": "object",
            "properties": {"total": {"$ref": "#/$defs/Money"}},
            "required": ["total"]
        }))
        .unwrap();
        assert_eq!(object_of(&ty).property("total").unwrap().ty, UdmType::Number);
    }

    #[test]
    fn ref_errors() {
        let missing = import(&json!({"$ref": "#/definitions/Nope"}));
        assert!(matches!(missing, Err(ImportError::UnresolvedReference { .. })));
        let remote = import(&json!({"$ref": "https://example.com/s.json"}));
        assert!(matches!(remote, Err(ImportError::UnresolvedReference { .. })));
        let recursive = import(&json!({
            "definitions": {"Node": {"type": "object", "properties": {"next": {"$ref": "#/definitions/Node"}}}},
            "$ref": "#/definitions/Node"
        }));
        assert_eq!(
            recursive,
            Err(ImportError::RecursiveReference { reference: "#/definitions/Node".into() })
        );
    }

    #[test]
    fn unknown_type_names_fail() {
        assert_eq!(
            import(&json!({"type": "decimal"})),
            Err(ImportError::UnknownType { name: "decimal".into() })
        );
    }

    #[test]
    fn sibling_keywords_join_all_of() {
        let ty = import(&json!({
            "$defs": {"Base": {"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}},
            "type": "object",
            "properties": {"amount": {"type": "number"}},
            "required": ["amount"],
            "allOf": [{"$ref": "#/$defs/Base"}]
        }))
        .unwrap();
        let obj = object_of(&ty);
        assert_eq!(obj.property("amount").unwrap().ty, UdmType::Number);
        assert!(obj.property("amount").unwrap().required);
        assert!(obj.property("id").unwrap().required);
    }

    #[test]
    fn sibling_properties_reach_every_one_of_branch() {
        let ty = import(&json!({
            "type": "object",
            "properties": {"email": {"type": "string"}, "phone": {"type": "string"}},
            "oneOf": [{"required": ["email"]}, {"required": ["phone"]}]
        }))
        .unwrap();
        let UdmType::Union(members) = &ty else { panic!("expected a union, got {ty}") };
        assert_eq!(members.len(), 2);
        for (member, key) in members.iter().zip(["email", "phone"]) {
            let obj = object_of(member);
            assert_eq!(obj.property("email").unwrap().ty, UdmType::String);
            assert_eq!(obj.property("phone").unwrap().ty, UdmType::String);
            assert!(obj.property(key).unwrap().required, "{member}");
        }
    }

    #[test]
    fn empty_enum_is_unsupported() {
        assert!(matches!(
            import(&json!({"enum": []})),
            Err(ImportError::Unsupported { path, .. }) if path == "#/enum"
        ));
    }
}
