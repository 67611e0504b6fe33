//! Structural comparison of a generated schema against an expected one.
//!
//! JSON documents are walked key by key. Arrays under keywords whose order
//! carries no meaning (`required`, `type`, `enum`, `anyOf`, `oneOf`) compare
//! as sets. XSD text compares line by line after whitespace normalization.
use std::fmt;

use serde_json::Value;

use crate::export::RenderedDocument;

/// Keywords whose array values are unordered.
const UNORDERED_KEYWORDS: &[&str] = &["required", "type", "enum", "anyOf", "oneOf"];

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDifference {
    /// JSON pointer into the document, or `line N` for XSD.
    pub path: String,
    /// `None` when the generated schema has something the expected lacks.
    pub expected: Option<Value>,
    /// `None` when the generated schema is missing something.
    pub actual: Option<Value>,
}

impl fmt::Display for SchemaDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        match (&self.expected, &self.actual) {
            (Some(expected), Some(actual)) => write!(f, "{path}: expected {expected}, found {actual}"),
            (Some(expected), None) => write!(f, "{path}: missing {expected}"),
            (None, Some(actual)) => write!(f, "{path}: unexpected {actual}"),
            (None, None) => write!(f, "{path}: differs"),
        }
    }
}

pub fn diff_documents(expected: &RenderedDocument, actual: &RenderedDocument) -> Vec<SchemaDifference> {
    match (expected, actual) {
        (RenderedDocument::Json(e), RenderedDocument::Json(a)) => diff_json(e, a),
        (RenderedDocument::Xml(e), RenderedDocument::Xml(a)) => diff_xml(e, a),
        (e, a) => vec![SchemaDifference {
            path: String::new(),
            expected: Some(Value::from(document_kind(e))),
            actual: Some(Value::from(document_kind(a))),
        }],
    }
}

pub fn diff_json(expected: &Value, actual: &Value) -> Vec<SchemaDifference> {
    let mut out = Vec::new();
    walk(String::new(), None, expected, actual, &mut out);
    out
}

fn walk(path: String, keyword: Option<&str>, expected: &Value, actual: &Value, out: &mut Vec<SchemaDifference>) {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            for (key, ev) in e {
                let child = format!("{path}/{}", escape_pointer(key));
                match a.get(key) {
                    Some(av) => walk(child, Some(key), ev, av, out),
                    None => out.push(SchemaDifference { path: child, expected: Some(ev.clone()), actual: None }),
                }
            }
            for (key, av) in a.iter().filter(|(k, _)| !e.contains_key(*k)) {
                out.push(SchemaDifference {
                    path: format!("{path}/{}", escape_pointer(key)),
                    expected: None,
                    actual: Some(av.clone()),
                });
            }
        }
        (Value::Array(e), Value::Array(a)) if keyword.is_some_and(|k| UNORDERED_KEYWORDS.contains(&k)) => {
            if !same_members(e, a) {
                out.push(SchemaDifference { path, expected: Some(expected.clone()), actual: Some(actual.clone()) });
            }
        }
        (Value::Array(e), Value::Array(a)) => {
            for (i, pair) in e.iter().zip(a).enumerate() {
                walk(format!("{path}/{i}"), None, pair.0, pair.1, out);
            }
            for (i, ev) in e.iter().enumerate().skip(a.len()) {
                out.push(SchemaDifference { path: format!("{path}/{i}"), expected: Some(ev.clone()), actual: None });
            }
            for (i, av) in a.iter().enumerate().skip(e.len()) {
                out.push(SchemaDifference { path: format!("{path}/{i}"), expected: None, actual: Some(av.clone()) });
            }
        }
        (e, a) if e == a => {}
        (e, a) => out.push(SchemaDifference { path, expected: Some(e.clone()), actual: Some(a.clone()) }),
    }
}

/// Multiset equality; members may themselves be objects, so no hashing.
fn same_members(expected: &[Value], actual: &[Value]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = actual.iter().collect();
    for e in expected {
        match unmatched.iter().position(|a| *a == e) {
            Some(i) => {
                unmatched.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

fn diff_xml(expected: &str, actual: &str) -> Vec<SchemaDifference> {
    let e = normalized_lines(expected);
    let a = normalized_lines(actual);
    let mut out = Vec::new();
    for i in 0..e.len().max(a.len()) {
        let (el, al) = (e.get(i), a.get(i));
        if el != al {
            out.push(SchemaDifference {
                path: format!("line {}", i + 1),
                expected: el.map(|s| Value::from(s.as_str())),
                actual: al.map(|s| Value::from(s.as_str())),
            });
        }
    }
    out
}

fn normalized_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn document_kind(doc: &RenderedDocument) -> &'static str {
    match doc {
        RenderedDocument::Json(_) => "JSON document",
        RenderedDocument::Xml(_) => "XSD document",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_is_unordered() {
        let e = json!({"type": "object", "required": ["a", "b"]});
        let a = json!({"type": "object", "required": ["b", "a"]});
        assert!(diff_json(&e, &a).is_empty());
    }

    #[test]
    fn reports_changed_missing_and_extra_keys() {
        let e = json!({"properties": {"total": {"type": "number"}, "id": {"type": "string"}}});
        let a = json!({"properties": {"total": {"type": "integer"}, "extra": {}}});
        let diffs = diff_json(&e, &a);
        let paths: Vec<&str> = diffs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["/properties/total/type", "/properties/id", "/properties/extra"]);
        assert_eq!(diffs[0].to_string(), r#"/properties/total/type: expected "number", found "integer""#);
    }

    #[test]
    fn tuple_items_stay_ordered() {
        let e = json!({"prefixItems": [{"type": "string"}, {"type": "integer"}]});
        let a = json!({"prefixItems": [{"type": "integer"}, {"type": "string"}]});
        assert_eq!(diff_json(&e, &a).len(), 2);
    }

    #[test]
    fn xsd_ignores_indentation() {
        let e = RenderedDocument::Xml("<a>\n  <b/>\n</a>\n".into());
        let a = RenderedDocument::Xml("<a>\n<b/>\n\n</a>".into());
        assert!(diff_documents(&e, &a).is_empty());
        let c = RenderedDocument::Xml("<a>\n<c/>\n</a>".into());
        assert_eq!(diff_documents(&e, &c)[0].path, "line 2");
    }

    #[test]
    fn format_mismatch_is_one_difference() {
        let diffs = diff_documents(&RenderedDocument::Json(json!({})), &RenderedDocument::Xml(String::new()));
        assert_eq!(diffs.len(), 1);
    }
}
