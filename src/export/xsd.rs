//! [`UdmType`] → XSD source text.
//!
//! Objects render as `xs:complexType`: `@`-prefixed properties become
//! attributes, `_text` becomes simple content, everything else an element
//! of an `xs:sequence`. XSD has no unions, so `Union` and bare `Null`
//! degrade to `xs:anyType` and the loss is reported as a warning.
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::SchemaGenerationError;
use crate::export::SchemaFormat;
use crate::import::xsd::{ATTRIBUTE_PREFIX, TEXT_PROPERTY};
use crate::types::{ObjectType, PropertyInfo, UNBOUNDED, UdmType};

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const DEFAULT_ROOT_NAME: &str = "root";
/// Element name used for the members of a bare array.
pub const ITEM_ELEMENT: &str = "item";

const INDENT: &str = "  ";

/// Element and attribute names: an XML NCName.
static XML_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}._\-]*$").expect("valid XML name regex"));

/// Render `ty` as a schema with a single global element `root_name`.
/// Returns the document and the information-loss warnings.
pub fn to_xsd(ty: &UdmType, root_name: &str) -> Result<(String, Vec<String>), SchemaGenerationError> {
    reject_non_data(ty)?;
    let mut w = XsdWriter::default();
    w.line(0, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    w.line(0, &format!(r#"<xs:schema xmlns:xs="{XS_NAMESPACE}" elementFormDefault="qualified">"#));
    w.element(1, root_name, ty, Occurrence::ONCE, None, root_name)?;
    w.line(0, "</xs:schema>");
    Ok((w.out, w.warnings))
}

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    min: u32,
    /// [`UNBOUNDED`] for no upper bound.
    max: i32,
}

impl Occurrence {
    const ONCE: Occurrence = Occurrence { min: 1, max: 1 };

    fn attributes(self) -> String {
        let mut out = String::new();
        if self.min != 1 {
            let _ = write!(out, r#" minOccurs="{}""#, self.min);
        }
        match self.max {
            1 => {}
            m if m < 0 => out.push_str(r#" maxOccurs="unbounded""#),
            m => {
                let _ = write!(out, r#" maxOccurs="{m}""#);
            }
        }
        out
    }
}

#[derive(Default)]
struct XsdWriter {
    out: String,
    warnings: Vec<String>,
}

impl XsdWriter {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn degrade(&mut self, path: &str, ty: &UdmType) {
        let message = format!("{path}: {ty} has no XSD equivalent, rendered as xs:anyType");
        warn!("{message}");
        self.warnings.push(message);
    }

    fn element(
        &mut self,
        depth: usize,
        name: &str,
        ty: &UdmType,
        occurs: Occurrence,
        description: Option<&str>,
        path: &str,
    ) -> Result<(), SchemaGenerationError> {
        check_name(name, ty)?;
        let open = format!(r#"<xs:element name="{}"{}"#, escape(name), occurs.attributes());
        match ty {
            UdmType::Any => {
                self.line(depth, &format!(r#"{open} type="xs:anyType"/>"#));
                return Ok(());
            }
            UdmType::Null | UdmType::Union(_) => {
                self.degrade(path, ty);
                self.line(depth, &format!(r#"{open} type="xs:anyType"/>"#));
                return Ok(());
            }
            UdmType::Function(_) | UdmType::Generic(_) => return Err(unsupported(ty)),
            _ => {}
        }
        self.line(depth, &format!("{open}>"));
        if let Some(description) = description {
            self.annotation(depth + 1, description);
        }
        self.type_body(depth + 1, ty, path)?;
        self.line(depth, "</xs:element>");
        Ok(())
    }

    fn annotation(&mut self, depth: usize, text: &str) {
        self.line(depth, "<xs:annotation>");
        self.line(depth + 1, &format!("<xs:documentation>{}</xs:documentation>", escape(text)));
        self.line(depth, "</xs:annotation>");
    }

    /// Anonymous type definition for an element of type `ty`.
    fn type_body(&mut self, depth: usize, ty: &UdmType, path: &str) -> Result<(), SchemaGenerationError> {
        match ty {
            UdmType::Array(el) => {
                self.line(depth, "<xs:complexType>");
                self.line(depth + 1, "<xs:sequence>");
                let occurs = Occurrence { min: 0, max: UNBOUNDED };
                let item_path = format!("{path}/{ITEM_ELEMENT}");
                self.element(depth + 2, ITEM_ELEMENT, el, occurs, None, &item_path)?;
                self.line(depth + 1, "</xs:sequence>");
                self.line(depth, "</xs:complexType>");
            }
            UdmType::Object(obj) => self.complex_type(depth, obj, path)?,
            primitive => {
                let base = builtin_name(primitive).ok_or_else(|| unsupported(primitive))?;
                self.line(depth, "<xs:simpleType>");
                self.line(depth + 1, &format!(r#"<xs:restriction base="{base}"/>"#));
                self.line(depth, "</xs:simpleType>");
            }
        }
        Ok(())
    }

    fn complex_type(&mut self, depth: usize, obj: &ObjectType, path: &str) -> Result<(), SchemaGenerationError> {
        let attributes: Vec<(&str, &PropertyInfo)> = obj
            .properties
            .iter()
            .filter_map(|(k, p)| Some((k.strip_prefix(ATTRIBUTE_PREFIX)?, p)))
            .collect();
        let children: Vec<(&String, &PropertyInfo)> = obj
            .properties
            .iter()
            .filter(|(k, _)| !k.starts_with(ATTRIBUTE_PREFIX) && k.as_str() != TEXT_PROPERTY)
            .collect();
        let text = obj.property(TEXT_PROPERTY);

        // text next to attributes only: simple content
        if let (Some(text), true) = (text, children.is_empty() && !obj.additional_properties) {
            let base = match builtin_name(&text.ty) {
                Some(base) => base,
                None => {
                    self.degrade(&format!("{path}/{TEXT_PROPERTY}"), &text.ty);
                    "xs:string"
                }
            };
            self.line(depth, "<xs:complexType>");
            self.line(depth + 1, "<xs:simpleContent>");
            self.line(depth + 2, &format!(r#"<xs:extension base="{base}">"#));
            self.attributes(depth + 3, &attributes, path)?;
            self.line(depth + 2, "</xs:extension>");
            self.line(depth + 1, "</xs:simpleContent>");
            self.line(depth, "</xs:complexType>");
            return Ok(());
        }

        let mixed = if text.is_some() { r#" mixed="true""# } else { "" };
        self.line(depth, &format!("<xs:complexType{mixed}>"));
        if !children.is_empty() || obj.additional_properties {
            self.line(depth + 1, "<xs:sequence>");
            for (name, prop) in &children {
                let (ty, occurs) = element_occurrence(prop);
                let child_path = format!("{path}/{name}");
                self.element(depth + 2, name, ty, occurs, prop.description.as_deref(), &child_path)?;
            }
            if obj.additional_properties {
                self.line(
                    depth + 2,
                    r#"<xs:any minOccurs="0" maxOccurs="unbounded" processContents="lax"/>"#,
                );
            }
            self.line(depth + 1, "</xs:sequence>");
        }
        self.attributes(depth + 1, &attributes, path)?;
        self.line(depth, "</xs:complexType>");
        Ok(())
    }

    fn attributes(
        &mut self,
        depth: usize,
        attributes: &[(&str, &PropertyInfo)],
        path: &str,
    ) -> Result<(), SchemaGenerationError> {
        for (name, prop) in attributes {
            check_name(name, &prop.ty)?;
            let usage = if prop.is_optional() { "optional" } else { "required" };
            let base = match builtin_name(&prop.ty) {
                Some(base) => base,
                None => {
                    // attributes only carry simple values
                    self.degrade(&format!("{path}/{ATTRIBUTE_PREFIX}{name}"), &prop.ty);
                    "xs:anySimpleType"
                }
            };
            let open = format!(r#"<xs:attribute name="{}" use="{usage}""#, escape(name));
            match &prop.description {
                None => self.line(depth, &format!(r#"{open} type="{base}"/>"#)),
                Some(description) => {
                    self.line(depth, &format!(r#"{open} type="{base}">"#));
                    self.annotation(depth + 1, description);
                    self.line(depth, "</xs:attribute>");
                }
            }
        }
        Ok(())
    }
}

/// Array-typed properties repeat the element instead of nesting a wrapper.
fn element_occurrence(prop: &PropertyInfo) -> (&UdmType, Occurrence) {
    let min = if prop.is_optional() { 0 } else { prop.min_occurs.max(1) };
    match &prop.ty {
        UdmType::Array(el) => {
            let max = if prop.max_occurs > 1 { prop.max_occurs } else { UNBOUNDED };
            (el, Occurrence { min, max })
        }
        ty => (ty, Occurrence { min, max: 1 }),
    }
}

fn builtin_name(ty: &UdmType) -> Option<&'static str> {
    match ty {
        UdmType::String => Some("xs:string"),
        UdmType::Number => Some("xs:decimal"),
        UdmType::Integer => Some("xs:integer"),
        UdmType::Boolean => Some("xs:boolean"),
        _ => None,
    }
}

/// Functions and placeholders have no schema anywhere in the tree, not even
/// inside a union that would otherwise degrade to `xs:anyType`.
fn reject_non_data(ty: &UdmType) -> Result<(), SchemaGenerationError> {
    match ty {
        UdmType::Function(_) | UdmType::Generic(_) => Err(unsupported(ty)),
        UdmType::Array(el) => reject_non_data(el),
        UdmType::Object(obj) => obj.properties.values().try_for_each(|p| reject_non_data(&p.ty)),
        UdmType::Union(members) => members.iter().try_for_each(reject_non_data),
        _ => Ok(()),
    }
}

fn check_name(name: &str, ty: &UdmType) -> Result<(), SchemaGenerationError> {
    if XML_NAME.is_match(name) {
        return Ok(());
    }
    Err(SchemaGenerationError::UnsupportedTypeForFormat {
        ty: ty.clone(),
        format: SchemaFormat::Xsd,
        reason: format!("'{name}' is not a valid XML name"),
    })
}

fn unsupported(ty: &UdmType) -> SchemaGenerationError {
    SchemaGenerationError::UnsupportedTypeForFormat {
        ty: ty.clone(),
        format: SchemaFormat::Xsd,
        reason: "only data types have a schema".into(),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
