//! Parse-tree types for the restricted query language
//!
//! The tree mirrors the grammar productions: one query node owning its
//! clauses, built per request and discarded after translation.

use serde::{Deserialize, Serialize};

/// Root node produced by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<JoinClause>,
    /// WHERE conditions, combined with implicit AND.
    pub conditions: Vec<Condition>,
    pub order: Vec<OrderKey>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Whether the source text carried a trailing `;`.
    pub semicolon: bool,
}

/// A select-list entry; `AS` aliases are only legal here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectItem {
    pub column: ColumnExpr,
    pub alias: Option<String>,
}

/// A column reference, optionally qualified and optionally descending into a
/// JSONB document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnExpr {
    pub qualifier: Option<String>,
    pub name: String,
    /// JSONB access chain in source order, empty for plain columns.
    pub path: Vec<JsonbStep>,
}

impl ColumnExpr {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            path: Vec::new(),
        }
    }

    pub fn is_jsonb(&self) -> bool {
        !self.path.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonbStep {
    pub op: JsonbOp,
    /// Key text with quote escapes already resolved.
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonbOp {
    /// `->` sub-document access
    Field,
    /// `->>` text extraction
    Text,
}

impl JsonbOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            JsonbOp::Field => "->",
            JsonbOp::Text => "->>",
        }
    }
}

/// A table reference: optional schema, name, optional alias.
///
/// When the source supplies three identifiers the first is the schema, the
/// second the table, the third the alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Join,
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    /// Normalize a join keyword as written by a caller. Accepts the bare
    /// type (`INNER`), the spaced form (`INNER JOIN`), and the concatenated
    /// form (`INNERJOIN`), in any case.
    pub fn parse(text: &str) -> Option<Self> {
        let mut compact = text.to_ascii_uppercase();
        compact.retain(|c| !c.is_whitespace());
        match compact.as_str() {
            "JOIN" => Some(JoinType::Join),
            "INNER" | "INNERJOIN" => Some(JoinType::Inner),
            "LEFT" | "LEFTJOIN" => Some(JoinType::Left),
            "RIGHT" | "RIGHTJOIN" => Some(JoinType::Right),
            "FULL" | "FULLJOIN" => Some(JoinType::Full),
            "CROSS" | "CROSSJOIN" => Some(JoinType::Cross),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            JoinType::Join => "JOIN",
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub left: ColumnExpr,
    pub op: CompareOp,
    pub right: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    ILike,
}

impl CompareOp {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "=" => Some(CompareOp::Eq),
            "!=" | "<>" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "LIKE" => Some(CompareOp::Like),
            "ILIKE" => Some(CompareOp::ILike),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::ILike => "ILIKE",
        }
    }
}

/// Right-hand side of a condition: another column (rendered as literal SQL
/// text) or a value (bound as a parameter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operand {
    Column(ColumnExpr),
    Value(Literal),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// JSONB object literal, pairs in source order.
    Object(Vec<(String, Literal)>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderKey {
    pub column: ColumnExpr,
    pub desc: bool,
}
