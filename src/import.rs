//! Schema importers: an already parsed schema document in, a populated root
//! [`TypeEnvironment`] out.
//!
//! Every importer produces one root type which is bound under [`INPUT_ROOT`].
//! When the root type is an object, each top-level property is bound as well
//! (`input.Order`, `input.customer`, ...) so exact lookups hit directly.
pub mod avro;
pub mod json_schema;
pub mod xsd;

use std::path::Path;
use tracing::debug;

use crate::env::TypeEnvironment;
use crate::error::ImportError;
use crate::path_de;
use crate::types::UdmType;

pub use avro::AvroSchema;
pub use xsd::XsdSchema;

/// Binding name of the transformation input.
pub const INPUT_ROOT: &str = "input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaKind {
    Xsd,
    JsonSchema,
    Avro,
}

impl SchemaKind {
    /// Guess the notation from a file name: `.avsc` is Avro, `.xsd.json` is
    /// a parsed XSD model, anything else is JSON Schema.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".avsc") {
            SchemaKind::Avro
        } else if name.ends_with(".xsd.json") {
            SchemaKind::Xsd
        } else {
            SchemaKind::JsonSchema
        }
    }
}

/// A schema document handed over by the schema parser.
#[derive(Debug, Clone)]
pub enum ParsedSchema {
    Xsd(XsdSchema),
    JsonSchema(serde_json::Value),
    Avro(AvroSchema),
}

impl ParsedSchema {
    /// Load the JSON form of a schema of the given kind.
    pub fn from_json_str(kind: SchemaKind, src: &str) -> Result<Self, ImportError> {
        let value: serde_json::Value = path_de::from_str_with_path(src)?;
        Self::from_json_value(kind, &value)
    }

    pub fn from_json_value(kind: SchemaKind, value: &serde_json::Value) -> Result<Self, ImportError> {
        match kind {
            SchemaKind::Xsd => Ok(ParsedSchema::Xsd(path_de::from_value_with_path(value)?)),
            SchemaKind::JsonSchema => Ok(ParsedSchema::JsonSchema(value.clone())),
            SchemaKind::Avro => Ok(ParsedSchema::Avro(AvroSchema::from_json(value)?)),
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            ParsedSchema::Xsd(_) => SchemaKind::Xsd,
            ParsedSchema::JsonSchema(_) => SchemaKind::JsonSchema,
            ParsedSchema::Avro(_) => SchemaKind::Avro,
        }
    }
}

/// The type of a whole input document.
pub fn schema_type(schema: &ParsedSchema) -> Result<UdmType, ImportError> {
    match schema {
        ParsedSchema::Xsd(xsd) => xsd::import(xsd),
        ParsedSchema::JsonSchema(value) => json_schema::import(value),
        ParsedSchema::Avro(avro) => avro::import(avro),
    }
}

/// Import a schema into a fresh root environment.
pub fn build_type_environment(schema: &ParsedSchema) -> Result<TypeEnvironment<'static>, ImportError> {
    let root = schema_type(schema)?;
    let env = bind_root(root);
    debug!(kind = ?schema.kind(), bindings = env.len(), "imported schema");
    Ok(env)
}

fn bind_root(root: UdmType) -> TypeEnvironment<'static> {
    let mut env = TypeEnvironment::new();
    if let UdmType::Object(obj) = &root {
        for (name, prop) in &obj.properties {
            let path = format!("{INPUT_ROOT}.{name}");
            debug!(%path, ty = %prop.ty, "bound");
            env.bind(path, prop.ty.clone());
        }
    }
    env.bind(INPUT_ROOT, root);
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(SchemaKind::from_path(Path::new("a/order.avsc")), SchemaKind::Avro);
        assert_eq!(SchemaKind::from_path(Path::new("order.XSD.json")), SchemaKind::Xsd);
        assert_eq!(SchemaKind::from_path(Path::new("order.schema.json")), SchemaKind::JsonSchema);
    }

    #[test]
    fn top_level_properties_are_bound() {
        let schema = ParsedSchema::from_json_str(
            SchemaKind::JsonSchema,
            r#"{"type": "object", "properties": {"total": {"type": "number"}}, "required": ["total"]}"#,
        )
        .unwrap();
        let env = build_type_environment(&schema).unwrap();
        assert_eq!(env.lookup("input.total"), Some(&UdmType::Number));
        assert!(matches!(env.lookup("input"), Some(UdmType::Object(_))));
        assert_eq!(env.lookup_nested("input.total"), Some(UdmType::Number));
    }
}
