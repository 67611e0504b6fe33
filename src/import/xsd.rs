//! XSD → [`UdmType`].
//!
//! The XML parser hands over an already resolved document model (this
//! module's [`XsdSchema`], serde-loadable from its JSON form). Conventions:
//!
//! - attributes become `@name` properties
//! - repeated elements (`maxOccurs` > 1 or `unbounded`) become arrays
//! - an `xs:choice` becomes a union of its branches under `_choice`
//!   (`_choice2`, ... for further groups in the same type)
//! - simple content is stored under `_text`
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::types::{ObjectType, PropertyInfo, UNBOUNDED, UdmType, unify};

pub const CHOICE_PROPERTY: &str = "_choice";
pub const TEXT_PROPERTY: &str = "_text";
pub const ATTRIBUTE_PREFIX: &str = "@";

// ————————————————————————————————————————————————————————————————————————————
// MODEL
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsdSchema {
    #[serde(default)]
    pub target_namespace: Option<String>,
    /// Global element declarations.
    #[serde(default)]
    pub elements: Vec<XsdElement>,
    #[serde(default)]
    pub complex_types: Vec<XsdComplexType>,
    #[serde(default)]
    pub simple_types: Vec<XsdSimpleType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsdElement {
    #[serde(default)]
    pub name: Option<String>,
    /// Reference to a global element (`ref="tns:Address"`).
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub complex_type: Option<Box<XsdComplexType>>,
    #[serde(default)]
    pub simple_type: Option<XsdSimpleType>,
    #[serde(default = "one")]
    pub min_occurs: u32,
    #[serde(default = "one_i32", deserialize_with = "max_occurs")]
    pub max_occurs: i32,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsdComplexType {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<XsdParticle>,
    #[serde(default)]
    pub attributes: Vec<XsdAttribute>,
    /// Base type of `xs:simpleContent`.
    #[serde(default)]
    pub simple_content: Option<String>,
    #[serde(default)]
    pub mixed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum XsdParticle {
    Sequence(XsdGroup),
    Choice(XsdGroup),
    All(XsdGroup),
    Element(XsdElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsdGroup {
    #[serde(default)]
    pub particles: Vec<XsdParticle>,
    #[serde(default = "one")]
    pub min_occurs: u32,
    #[serde(default = "one_i32", deserialize_with = "max_occurs")]
    pub max_occurs: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsdAttribute {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub simple_type: Option<XsdSimpleType>,
    #[serde(default, rename = "use")]
    pub usage: AttributeUse,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeUse {
    #[default]
    Optional,
    Required,
    Prohibited,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XsdSimpleType {
    #[serde(default)]
    pub name: Option<String>,
    /// `xs:restriction base`.
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub enumeration: Vec<String>,
    /// `xs:list itemType`.
    #[serde(default)]
    pub list_of: Option<String>,
    /// `xs:union memberTypes`.
    #[serde(default)]
    pub union_of: Vec<String>,
}

fn one() -> u32 {
    1
}

fn one_i32() -> i32 {
    1
}

fn max_occurs<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Count(i32),
        Text(String),
    }
    match Raw::deserialize(d)? {
        Raw::Count(n) => Ok(n),
        Raw::Text(s) if s == "unbounded" => Ok(UNBOUNDED),
        Raw::Text(s) => s.parse().map_err(|_| D::Error::custom(format!("invalid maxOccurs '{s}'"))),
    }
}

fn is_repeated(max_occurs: i32) -> bool {
    max_occurs < 0 || max_occurs > 1
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-IN TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Built-in `xs:` simple type by local name.
fn builtin(local: &str) -> Option<UdmType> {
    let ty = match local {
        "string" | "normalizedString" | "token" | "language" | "Name" | "NCName" | "NMTOKEN"
        | "NMTOKENS" | "ID" | "IDREF" | "IDREFS" | "ENTITY" | "QName" | "anyURI" | "date"
        | "dateTime" | "time" | "duration" | "gYear" | "gYearMonth" | "gMonth" | "gMonthDay"
        | "gDay" | "base64Binary" | "hexBinary" => UdmType::String,
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger" | "positiveInteger"
        | "negativeInteger" | "nonPositiveInteger" | "unsignedLong" | "unsignedInt"
        | "unsignedShort" | "unsignedByte" => UdmType::Integer,
        "decimal" | "float" | "double" => UdmType::Number,
        "boolean" => UdmType::Boolean,
        "anyType" | "anySimpleType" => UdmType::Any,
        _ => return None,
    };
    Some(ty)
}

fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSION
// ————————————————————————————————————————————————————————————————————————————

/// Root type: one property per global element. A single global element is
/// required; with several, any one of them may be the document root.
pub fn import(schema: &XsdSchema) -> Result<UdmType, ImportError> {
    let mut cx = Converter::new(schema);
    let single = schema.elements.len() == 1;
    let mut properties = IndexMap::new();
    for element in &schema.elements {
        let (name, mut prop) = cx.element_property(element)?;
        if !single {
            prop.required = false;
            prop.min_occurs = 0;
        }
        debug!(element = %name, ty = %prop.ty, "imported global element");
        properties.insert(name, prop);
    }
    Ok(UdmType::Object(ObjectType { properties, additional_properties: false }))
}

struct Converter<'s> {
    complex: HashMap<&'s str, &'s XsdComplexType>,
    simple: HashMap<&'s str, &'s XsdSimpleType>,
    elements: HashMap<&'s str, &'s XsdElement>,
    /// Named types and referenced elements being expanded.
    resolving: Vec<String>,
}

impl<'s> Converter<'s> {
    fn new(schema: &'s XsdSchema) -> Self {
        Self {
            complex: schema
                .complex_types
                .iter()
                .filter_map(|t| Some((t.name.as_deref()?, t)))
                .collect(),
            simple: schema
                .simple_types
                .iter()
                .filter_map(|t| Some((t.name.as_deref()?, t)))
                .collect(),
            elements: schema
                .elements
                .iter()
                .filter_map(|e| Some((e.name.as_deref()?, e)))
                .collect(),
            resolving: Vec::new(),
        }
    }

    fn enter(&mut self, key: String) -> Result<(), ImportError> {
        if self.resolving.contains(&key) {
            warn!(reference = %key, "recursive XSD definition");
            return Err(ImportError::RecursiveReference { reference: key });
        }
        self.resolving.push(key);
        Ok(())
    }

    fn leave(&mut self) {
        self.resolving.pop();
    }

    /// Property name and info for an element particle.
    fn element_property(&mut self, element: &'s XsdElement) -> Result<(String, PropertyInfo), ImportError> {
        let (name, ty, documentation) = match &element.reference {
            Some(reference) => {
                let (_, local) = split_qname(reference);
                let target = *self
                    .elements
                    .get(local)
                    .ok_or_else(|| ImportError::UnresolvedReference { reference: reference.clone() })?;
                self.enter(format!("element {local}"))?;
                let ty = self.element_type(target);
                self.leave();
                (local.to_string(), ty?, target.documentation.clone())
            }
            None => {
                let name = element.name.clone().ok_or_else(|| ImportError::Malformed {
                    path: "element".into(),
                    message: "element without name or ref".into(),
                })?;
                (name, self.element_type(element)?, element.documentation.clone())
            }
        };
        let ty = if is_repeated(element.max_occurs) { UdmType::array(ty) } else { ty };
        let prop = PropertyInfo {
            ty,
            required: element.min_occurs > 0,
            min_occurs: element.min_occurs,
            max_occurs: element.max_occurs,
            description: documentation,
        };
        Ok((name, prop))
    }

    /// Type of one occurrence of the element.
    fn element_type(&mut self, element: &'s XsdElement) -> Result<UdmType, ImportError> {
        let ty = if let Some(complex) = &element.complex_type {
            self.complex_type(complex)?
        } else if let Some(simple) = &element.simple_type {
            self.simple_type(simple)?
        } else if let Some(type_name) = &element.type_name {
            self.named_type(type_name)?
        } else {
            UdmType::Any
        };
        Ok(if element.nillable { ty.make_nullable() } else { ty })
    }

    fn named_type(&mut self, qname: &str) -> Result<UdmType, ImportError> {
        let (prefix, local) = split_qname(qname);
        let is_xs = matches!(prefix, Some("xs" | "xsd"));
        if !is_xs {
            if let Some(complex) = self.complex.get(local).copied() {
                self.enter(format!("type {local}"))?;
                let ty = self.complex_type(complex);
                self.leave();
                return ty;
            }
            if let Some(simple) = self.simple.get(local).copied() {
                self.enter(format!("type {local}"))?;
                let ty = self.simple_type(simple);
                self.leave();
                return ty;
            }
        }
        builtin(local).ok_or_else(|| ImportError::UnknownType { name: qname.to_string() })
    }

    fn simple_type(&mut self, simple: &'s XsdSimpleType) -> Result<UdmType, ImportError> {
        if let Some(item) = &simple.list_of {
            return Ok(UdmType::array(self.named_type(item)?));
        }
        if !simple.union_of.is_empty() {
            let mut members = Vec::with_capacity(simple.union_of.len());
            for member in &simple.union_of {
                members.push(self.named_type(member)?);
            }
            return Ok(UdmType::union(members));
        }
        // a bare enumeration is a set of string tokens
        match &simple.base {
            Some(base) => self.named_type(base),
            None => Ok(UdmType::String),
        }
    }

    fn complex_type(&mut self, complex: &'s XsdComplexType) -> Result<UdmType, ImportError> {
        let mut out = ObjectType::default();

        for attr in &complex.attributes {
            if attr.usage == AttributeUse::Prohibited {
                continue;
            }
            let ty = match (&attr.simple_type, &attr.type_name) {
                (Some(simple), _) => self.simple_type(simple)?,
                (None, Some(name)) => self.named_type(name)?,
                (None, None) => UdmType::String,
            };
            let prop = if attr.usage == AttributeUse::Required {
                PropertyInfo::required(ty)
            } else {
                PropertyInfo::optional(ty)
            };
            out.properties.insert(
                format!("{ATTRIBUTE_PREFIX}{}", attr.name),
                prop.with_description(attr.documentation.clone()),
            );
        }

        if let Some(base) = &complex.simple_content {
            let ty = self.named_type(base)?;
            out.properties.insert(TEXT_PROPERTY.to_string(), PropertyInfo::required(ty));
        } else if complex.mixed {
            out.properties.insert(TEXT_PROPERTY.to_string(), PropertyInfo::optional(UdmType::String));
        }

        if let Some(content) = &complex.content {
            let mut choices = 0;
            self.particle(content, Occurs::ONCE, &mut out, &mut choices)?;
        }
        Ok(UdmType::Object(out))
    }

    /// Add the properties contributed by `particle` to `out`.
    fn particle(
        &mut self,
        particle: &'s XsdParticle,
        outer: Occurs,
        out: &mut ObjectType,
        choices: &mut usize,
    ) -> Result<(), ImportError> {
        match particle {
            XsdParticle::Element(element) => {
                let (name, prop) = self.element_property(element)?;
                add_property(out, name, outer.apply(prop));
            }
            XsdParticle::Sequence(group) | XsdParticle::All(group) => {
                let occurs = outer.then(group.min_occurs, group.max_occurs);
                for child in &group.particles {
                    self.particle(child, occurs, out, choices)?;
                }
            }
            XsdParticle::Choice(group) => {
                let mut branches = Vec::with_capacity(group.particles.len());
                for branch in &group.particles {
                    let mut branch_obj = ObjectType::default();
                    let mut nested = 0;
                    self.particle(branch, Occurs::ONCE, &mut branch_obj, &mut nested)?;
                    branches.push(UdmType::Object(branch_obj));
                }
                *choices += 1;
                let name = match *choices {
                    1 => CHOICE_PROPERTY.to_string(),
                    n => format!("{CHOICE_PROPERTY}{n}"),
                };
                let occurs = outer.then(group.min_occurs, group.max_occurs);
                let union = UdmType::union(branches);
                let ty = if occurs.repeated { UdmType::array(union) } else { union };
                let prop = PropertyInfo {
                    ty,
                    required: !occurs.optional,
                    min_occurs: if occurs.optional { 0 } else { 1 },
                    max_occurs: if occurs.repeated { UNBOUNDED } else { 1 },
                    description: None,
                };
                out.properties.insert(name, prop);
            }
        }
        Ok(())
    }
}

/// Multiplicity inherited from enclosing groups.
#[derive(Debug, Clone, Copy)]
struct Occurs {
    optional: bool,
    repeated: bool,
}

impl Occurs {
    const ONCE: Occurs = Occurs { optional: false, repeated: false };

    fn then(self, min_occurs: u32, max_occurs: i32) -> Occurs {
        Occurs {
            optional: self.optional || min_occurs == 0,
            repeated: self.repeated || is_repeated(max_occurs),
        }
    }

    fn apply(self, mut prop: PropertyInfo) -> PropertyInfo {
        if self.optional {
            prop.required = false;
            prop.min_occurs = 0;
        }
        if self.repeated && !prop.is_array() {
            prop.ty = UdmType::array(prop.ty);
            prop.max_occurs = UNBOUNDED;
        }
        prop
    }
}

/// A name seen twice in one content model repeats: the property becomes an
/// array of the unified occurrence types.
fn add_property(out: &mut ObjectType, name: String, prop: PropertyInfo) {
    match out.properties.get_mut(&name) {
        None => {
            out.properties.insert(name, prop);
        }
        Some(existing) => {
            let element = |p: &PropertyInfo| match (&p.ty, p.is_array()) {
                (UdmType::Array(el), true) => (**el).clone(),
                (ty, _) => ty.clone(),
            };
            existing.ty = UdmType::array(unify(&element(&*existing), &element(&prop)));
            existing.max_occurs = UNBOUNDED;
            existing.required = existing.required || prop.required;
            existing.min_occurs = existing.min_occurs.saturating_add(prop.min_occurs);
        }
    }
}
