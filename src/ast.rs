//! Expression tree handed over by the transformation-language parser.
//!
//! The parser itself lives outside this crate. Hosts either build these
//! nodes directly or deserialize them from a JSON document where every node
//! carries a `"kind"` tag, e.g.
//!
//! ```json
//! {"kind": "call", "name": "sum", "args": [{"kind": "path", "path": "input.total"}],
//!  "location": {"line": 3, "column": 5}}
//! ```
use std::fmt;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExprKind {
    Literal { value: Literal },
    /// Dotted path resolved against the environment (`input.Order.@id`).
    Path { path: String },
    /// Property access on a computed value (`first(xs).name`).
    Member { object: Box<Expr>, property: String },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Call { name: String, args: Vec<Expr> },
    /// `collection |> map(x => body)`
    Map { collection: Box<Expr>, lambda: Lambda },
    /// `collection |> filter(x => predicate)`
    Filter { collection: Box<Expr>, lambda: Lambda },
    Lambda(Lambda),
    /// `let name = value; body`
    Let { name: String, value: Box<Expr>, body: Box<Expr> },
    Object { entries: Vec<ObjectEntry> },
    Array { elements: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Literal {
    String(String),
    Integer(i64),
    Number(OrderedFloat<f64>),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "-")]
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { file: None, line, column }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, location: None }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Some(SourceLocation::new(line, column));
        self
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal { value: Literal::String(s.into()) })
    }

    pub fn integer(i: i64) -> Self {
        Self::new(ExprKind::Literal { value: Literal::Integer(i) })
    }

    pub fn number(n: f64) -> Self {
        Self::new(ExprKind::Literal { value: Literal::Number(OrderedFloat(n)) })
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(ExprKind::Literal { value: Literal::Boolean(b) })
    }

    pub fn null() -> Self {
        Self::new(ExprKind::Literal { value: Literal::Null })
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self::new(ExprKind::Path { path: path.into() })
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Self::new(ExprKind::Member { object: Box::new(object), property: property.into() })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::Unary { op, operand: Box::new(operand) })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) })
    }

    pub fn conditional(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call { name: name.into(), args })
    }

    pub fn lambda<I, S>(params: I, body: Expr) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ExprKind::Lambda(Lambda::new(params, body)))
    }

    pub fn map(collection: Expr, param: impl Into<String>, body: Expr) -> Self {
        Self::new(ExprKind::Map {
            collection: Box::new(collection),
            lambda: Lambda::new([Into::<String>::into(param)], body),
        })
    }

    pub fn filter(collection: Expr, param: impl Into<String>, body: Expr) -> Self {
        Self::new(ExprKind::Filter {
            collection: Box::new(collection),
            lambda: Lambda::new([Into::<String>::into(param)], body),
        })
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Self::new(ExprKind::Let { name: name.into(), value: Box::new(value), body: Box::new(body) })
    }

    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Expr)>,
        K: Into<String>,
    {
        Self::new(ExprKind::Object {
            entries: entries
                .into_iter()
                .map(|(key, value)| ObjectEntry { key: key.into(), value })
                .collect(),
        })
    }

    pub fn array(elements: Vec<Expr>) -> Self {
        Self::new(ExprKind::Array { elements })
    }
}

impl Lambda {
    pub fn new<I, S>(params: I, body: Expr) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { params: params.into_iter().map(Into::into).collect(), body: Box::new(body) }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_nodes() {
        let src = r#"{
            "kind": "binary", "op": "*",
            "left": {"kind": "path", "path": "item.@quantity"},
            "right": {"kind": "literal", "value": {"number": 1.5}},
            "location": {"line": 2, "column": 7}
        }"#;
        let expr: Expr = serde_json::from_str(src).unwrap();
        assert_eq!(expr.location, Some(SourceLocation::new(2, 7)));
        match expr.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Mul);
                assert_eq!(*left, Expr::path("item.@quantity"));
                assert_eq!(*right, Expr::number(1.5));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn deserializes_lambda_nodes() {
        let src = r#"{
            "kind": "map",
            "collection": {"kind": "path", "path": "input.xs"},
            "lambda": {"params": ["x"], "body": {"kind": "literal", "value": "null"}}
        }"#;
        let expr: Expr = serde_json::from_str(src).unwrap();
        assert_eq!(expr, Expr::map(Expr::path("input.xs"), "x", Expr::null()));
    }

    #[test]
    fn location_display() {
        assert_eq!(SourceLocation::new(3, 9).to_string(), "3:9");
        assert_eq!(SourceLocation::new(3, 9).in_file("t.utlx").to_string(), "t.utlx:3:9");
    }
}
