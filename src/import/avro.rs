//! Avro → [`UdmType`].
//!
//! [`AvroSchema::from_json`] reads the JSON form of an `.avsc` document;
//! [`import`] maps it onto the type model. Records are closed objects whose
//! fields are required unless their type is a union containing `null`.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::types::{ObjectType, PropertyInfo, UdmType};

#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(AvroRecord),
    Enum { name: Name, symbols: Vec<String>, doc: Option<String> },
    Fixed { name: Name, size: usize },
    Array(Box<AvroSchema>),
    Map(Box<AvroSchema>),
    Union(Vec<AvroSchema>),
    /// Reference to a named type defined elsewhere in the document.
    Named(String),
    Logical { logical_type: String, base: Box<AvroSchema> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvroRecord {
    pub name: Name,
    pub doc: Option<String>,
    pub fields: Vec<AvroField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvroField {
    pub name: String,
    pub doc: Option<String>,
    pub schema: AvroSchema,
    pub default: Option<Value>,
}

impl Name {
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

impl AvroSchema {
    pub fn from_json(value: &Value) -> Result<Self, ImportError> {
        parse(value, None, "$")
    }
}

fn malformed(path: &str, message: impl Into<String>) -> ImportError {
    ImportError::Malformed { path: path.to_string(), message: message.into() }
}

fn parse(value: &Value, namespace: Option<&str>, path: &str) -> Result<AvroSchema, ImportError> {
    match value {
        Value::String(name) => Ok(primitive(name).unwrap_or_else(|| AvroSchema::Named(name.clone()))),
        Value::Array(branches) => branches
            .iter()
            .enumerate()
            .map(|(i, b)| parse(b, namespace, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(AvroSchema::Union),
        Value::Object(obj) => parse_object(obj, namespace, path),
        other => Err(malformed(path, format!("expected a schema, found {other}"))),
    }
}

fn primitive(name: &str) -> Option<AvroSchema> {
    let schema = match name {
        "null" => AvroSchema::Null,
        "boolean" => AvroSchema::Boolean,
        "int" => AvroSchema::Int,
        "long" => AvroSchema::Long,
        "float" => AvroSchema::Float,
        "double" => AvroSchema::Double,
        "bytes" => AvroSchema::Bytes,
        "string" => AvroSchema::String,
        _ => return None,
    };
    Some(schema)
}

fn parse_object(obj: &Map<String, Value>, namespace: Option<&str>, path: &str) -> Result<AvroSchema, ImportError> {
    let type_value = obj.get("type").ok_or_else(|| malformed(path, "missing `type`"))?;

    if let Some(logical) = obj.get("logicalType").and_then(Value::as_str) {
        let mut base = obj.clone();
        base.remove("logicalType");
        return Ok(AvroSchema::Logical {
            logical_type: logical.to_string(),
            base: Box::new(parse_object(&base, namespace, path)?),
        });
    }

    let str_field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    let name_of = || -> Result<Name, ImportError> {
        let raw = str_field("name").ok_or_else(|| malformed(path, "named type without `name`"))?;
        // a dotted name carries its own namespace
        Ok(match raw.rsplit_once('.') {
            Some((ns, local)) => Name { name: local.to_string(), namespace: Some(ns.to_string()) },
            None => Name {
                name: raw,
                namespace: str_field("namespace").or_else(|| namespace.map(str::to_string)),
            },
        })
    };

    match type_value.as_str() {
        Some("record") | Some("error") => {
            let name = name_of()?;
            let inner_ns = name.namespace.clone();
            let fields = obj
                .get("fields")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(path, "record without `fields`"))?;
            let mut parsed = Vec::with_capacity(fields.len());
            for (i, field) in fields.iter().enumerate() {
                let field_path = format!("{path}.fields[{i}]");
                let field_name = field
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed(&field_path, "field without `name`"))?;
                let field_type = field.get("type").ok_or_else(|| malformed(&field_path, "field without `type`"))?;
                parsed.push(AvroField {
                    name: field_name.to_string(),
                    doc: field.get("doc").and_then(Value::as_str).map(str::to_string),
                    schema: parse(field_type, inner_ns.as_deref(), &format!("{field_path}.type"))?,
                    default: field.get("default").cloned(),
                });
            }
            Ok(AvroSchema::Record(AvroRecord { name, doc: str_field("doc"), fields: parsed }))
        }
        Some("enum") => {
            let symbols = obj
                .get("symbols")
                .and_then(Value::as_array)
                .map(|s| s.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            Ok(AvroSchema::Enum { name: name_of()?, symbols, doc: str_field("doc") })
        }
        Some("fixed") => {
            let size = obj.get("size").and_then(Value::as_u64).unwrap_or(0) as usize;
            Ok(AvroSchema::Fixed { name: name_of()?, size })
        }
        Some("array") => {
            let items = obj.get("items").ok_or_else(|| malformed(path, "array without `items`"))?;
            Ok(AvroSchema::Array(Box::new(parse(items, namespace, &format!("{path}.items"))?)))
        }
        Some("map") => {
            let values = obj.get("values").ok_or_else(|| malformed(path, "map without `values`"))?;
            Ok(AvroSchema::Map(Box::new(parse(values, namespace, &format!("{path}.values"))?)))
        }
        // {"type": "string"}, {"type": {...}}, {"type": ["null", ...]}
        _ => parse(type_value, namespace, &format!("{path}.type")),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSION
// ————————————————————————————————————————————————————————————————————————————

pub fn import(schema: &AvroSchema) -> Result<UdmType, ImportError> {
    let mut named = HashMap::new();
    collect_named(schema, &mut named);
    let mut cx = Converter { named, resolving: Vec::new() };
    cx.convert(schema)
}

fn collect_named<'s>(schema: &'s AvroSchema, out: &mut HashMap<String, &'s AvroSchema>) {
    let mut register = |name: &Name| {
        out.entry(name.fullname()).or_insert(schema);
        out.entry(name.name.clone()).or_insert(schema);
    };
    match schema {
        AvroSchema::Record(record) => {
            register(&record.name);
            for field in &record.fields {
                collect_named(&field.schema, out);
            }
        }
        AvroSchema::Enum { name, .. } | AvroSchema::Fixed { name, .. } => register(name),
        AvroSchema::Array(inner) | AvroSchema::Map(inner) => collect_named(inner, out),
        AvroSchema::Logical { base, .. } => collect_named(base, out),
        AvroSchema::Union(branches) => {
            for branch in branches {
                collect_named(branch, out);
            }
        }
        _ => {}
    }
}

struct Converter<'s> {
    named: HashMap<String, &'s AvroSchema>,
    /// Records currently being expanded, by full name.
    resolving: Vec<String>,
}

impl<'s> Converter<'s> {
    fn convert(&mut self, schema: &'s AvroSchema) -> Result<UdmType, ImportError> {
        let ty = match schema {
            AvroSchema::Null => UdmType::Null,
            AvroSchema::Boolean => UdmType::Boolean,
            AvroSchema::Int | AvroSchema::Long => UdmType::Integer,
            AvroSchema::Float | AvroSchema::Double => UdmType::Number,
            AvroSchema::Bytes | AvroSchema::String => UdmType::String,
            AvroSchema::Enum { .. } | AvroSchema::Fixed { .. } => UdmType::String,
            AvroSchema::Array(items) => UdmType::array(self.convert(items)?),
            AvroSchema::Map(_) => UdmType::open_object(),
            AvroSchema::Union(branches) => {
                let mut members = Vec::with_capacity(branches.len());
                for branch in branches {
                    members.push(self.convert(branch)?);
                }
                UdmType::union(members)
            }
            AvroSchema::Logical { logical_type, base } => match logical_type.as_str() {
                "decimal" => UdmType::Number,
                _ => self.convert(base)?,
            },
            AvroSchema::Named(reference) => {
                let target = self
                    .named
                    .get(reference)
                    .copied()
                    .ok_or_else(|| ImportError::UnresolvedReference { reference: reference.clone() })?;
                self.convert(target)?
            }
            AvroSchema::Record(record) => self.convert_record(record)?,
        };
        Ok(ty)
    }

    fn convert_record(&mut self, record: &'s AvroRecord) -> Result<UdmType, ImportError> {
        let fullname = record.name.fullname();
        if self.resolving.contains(&fullname) {
            warn!(record = %fullname, "recursive Avro record");
            return Err(ImportError::RecursiveReference { reference: fullname });
        }
        self.resolving.push(fullname);
        let mut properties = IndexMap::with_capacity(record.fields.len());
        for field in &record.fields {
            let ty = match self.convert(&field.schema) {
                Ok(ty) => ty,
                Err(err) => {
                    self.resolving.pop();
                    return Err(err);
                }
            };
            let prop = if ty.is_nullable() && matches!(field.schema, AvroSchema::Union(_)) {
                PropertyInfo::optional(ty)
            } else {
                PropertyInfo::required(ty)
            };
            properties.insert(field.name.clone(), prop.with_description(field.doc.clone()));
        }
        if let Some(fullname) = self.resolving.pop() {
            debug!(record = %fullname, fields = properties.len(), "converted record");
        }
        Ok(UdmType::Object(ObjectType { properties, additional_properties: false }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn import_json(value: Value) -> Result<UdmType, ImportError> {
        import(&AvroSchema::from_json(&value)?)
    }

    #[test]
    fn record_fields() {
        let ty = import_json(json!({
            "type": "record", "name": "Order", "namespace": "shop",
            "fields": [
                {"name": "id", "type": "string", "doc": "order id"},
                {"name": "qty", "type": "int"},
                {"name": "price", "type": {"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}},
                {"name": "note", "type": ["null", "string"], "default": null},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "attrs", "type": {"type": "map", "values": "long"}},
                {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "DONE"]}},
                {"name": "placed", "type": {"type": "long", "logicalType": "timestamp-millis"}}
            ]
        }))
        .unwrap();
        let obj = ty.as_object().unwrap();
        assert!(!obj.additional_properties);
        let prop = |name: &str| obj.property(name).unwrap();
        assert_eq!(prop("id").description.as_deref(), Some("order id"));
        assert_eq!(prop("qty").ty, UdmType::Integer);
        assert_eq!(prop("price").ty, UdmType::Number);
        assert!(prop("note").is_optional());
        assert_eq!(prop("note").ty, UdmType::String.make_nullable());
        assert_eq!(prop("tags").ty, UdmType::array(UdmType::String));
        assert_eq!(prop("attrs").ty, UdmType::open_object());
        assert_eq!(prop("status").ty, UdmType::String);
        assert_eq!(prop("placed").ty, UdmType::Integer);
        assert!(prop("placed").required);
    }

    #[test]
    fn named_references_resolve_with_namespaces() {
        let ty = import_json(json!({
            "type": "record", "name": "Order", "namespace": "shop",
            "fields": [
                {"name": "billing", "type": {"type": "record", "name": "Address",
                    "fields": [{"name": "city", "type": "string"}]}},
                {"name": "shipping", "type": "shop.Address"},
                {"name": "fallback", "type": ["null", "Address"]}
            ]
        }))
        .unwrap();
        let obj = ty.as_object().unwrap();
        assert_eq!(obj.property("billing").unwrap().ty, obj.property("shipping").unwrap().ty);
        assert!(obj.property("fallback").unwrap().is_optional());
    }

    #[test]
    fn recursion_and_unknown_names() {
        let recursive = import_json(json!({
            "type": "record", "name": "Node",
            "fields": [{"name": "next", "type": ["null", "Node"]}]
        }));
        assert_eq!(recursive, Err(ImportError::RecursiveReference { reference: "Node".into() }));

        let unknown = import_json(json!({
            "type": "record", "name": "A", "fields": [{"name": "b", "type": "B"}]
        }));
        assert_eq!(unknown, Err(ImportError::UnresolvedReference { reference: "B".into() }));
    }

    #[test]
    fn malformed_documents_name_the_path() {
        let err = AvroSchema::from_json(&json!({"type": "record", "name": "A", "fields": [{"type": "int"}]}));
        assert!(matches!(err, Err(ImportError::Malformed { path, .. }) if path == "$.fields[0]"));
    }
}
