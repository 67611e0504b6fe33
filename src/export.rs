//! Rendering inferred types back into schema notations.
pub mod json_schema;
pub mod xsd;

use std::fmt;

use crate::error::SchemaGenerationError;
use crate::types::UdmType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SchemaFormat {
    JsonSchema,
    Xsd,
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaFormat::JsonSchema => f.write_str("JSON Schema"),
            SchemaFormat::Xsd => f.write_str("XSD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Name of the top-level XSD element.
    pub root_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { root_name: xsd::DEFAULT_ROOT_NAME.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedDocument {
    Json(serde_json::Value),
    Xml(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSchema {
    pub format: SchemaFormat,
    pub document: RenderedDocument,
    /// Information lost on the way, e.g. unions flattened to `xs:anyType`.
    pub warnings: Vec<String>,
}

impl RenderedSchema {
    /// The document as text: pretty JSON or the XSD source.
    pub fn to_text(&self) -> String {
        match &self.document {
            RenderedDocument::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            RenderedDocument::Xml(text) => text.clone(),
        }
    }
}

pub fn generate_schema(ty: &UdmType, format: SchemaFormat) -> Result<RenderedSchema, SchemaGenerationError> {
    generate_schema_with(ty, format, &ExportOptions::default())
}

pub fn generate_schema_with(
    ty: &UdmType,
    format: SchemaFormat,
    options: &ExportOptions,
) -> Result<RenderedSchema, SchemaGenerationError> {
    match format {
        SchemaFormat::JsonSchema => Ok(RenderedSchema {
            format,
            document: RenderedDocument::Json(json_schema::to_json_schema(ty)?),
            warnings: Vec::new(),
        }),
        SchemaFormat::Xsd => {
            let (text, warnings) = xsd::to_xsd(ty, &options.root_name)?;
            Ok(RenderedSchema { format, document: RenderedDocument::Xml(text), warnings })
        }
    }
}
