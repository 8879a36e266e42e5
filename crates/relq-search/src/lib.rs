//! Structured (search-engine-style) JSON front-end
//!
//! An independent surface syntax over the same allowlist and the same SQL
//! output form as the grammar front-end. A request names its base table and
//! joins with optional aliases, lists `_source` columns as `alias.column`,
//! and filters through a boolean `must` list of `match`/`range` clauses.
//!
//! Clause kinds are decided once during deserialization: `{"match": ...}`
//! and `{"range": ...}` become tagged variants, so translation never
//! inspects value shapes at run time.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use relq_ast::{ColumnExpr, Condition, JoinType, Operand};
use relq_schema::{Allowlist, ValidationError};
use relq_sql::SqlQuery;

/// Search-style request.
///
/// The top-level `from` key always names the source table; the pagination
/// row offset is read strictly from `offset`. A numeric `from` fails
/// deserialization instead of being silently treated as pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub from: String,

    #[serde(default)]
    pub joins: Vec<JoinSpec>,

    #[serde(rename = "_source")]
    pub source: Vec<String>,

    #[serde(default)]
    pub query: Option<QueryClause>,

    /// Result-row limit.
    #[serde(default)]
    pub size: Option<i64>,

    /// Pagination row offset.
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinSpec {
    /// Join keyword, e.g. `INNER` or `LEFT`.
    #[serde(rename = "type")]
    pub join_type: String,

    /// `"table"` or `"table alias"`, like the top-level `from`.
    pub table: String,

    /// Join condition text, parsed and validated before rendering.
    pub on: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryClause {
    #[serde(rename = "bool")]
    pub bool_clause: BoolClause,
}

/// Only `must` is supported: a logical AND of its members.
#[derive(Debug, Clone, Deserialize)]
pub struct BoolClause {
    #[serde(default)]
    pub must: Vec<MustClause>,
}

/// One `must` member, tagged by its JSON key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MustClause {
    /// Equality filters: each entry renders as `column = $n`.
    Match(BTreeMap<String, serde_json::Value>),
    /// Range filters: `gte`/`lte`/`gt`/`lt` per column.
    Range(BTreeMap<String, BTreeMap<String, serde_json::Value>>),
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid join condition: {0}")]
    Condition(#[from] relq_ast::ParseError),

    #[error("unsupported range operator: {0}")]
    UnsupportedOperator(String),

    #[error("malformed clause: {0}")]
    MalformedClause(String),
}

/// Translate a search request into SQL against the allowlist.
pub fn translate(
    request: &SearchRequest,
    allowlist: &Allowlist,
) -> Result<SqlQuery, TranslationError> {
    match translate_inner(request, allowlist) {
        Ok(rendered) => {
            debug!(sql = %rendered.sql, params = rendered.params.len(), "search request translated");
            Ok(rendered)
        }
        Err(err) => {
            warn!(error = %err, "search request rejected");
            Err(err)
        }
    }
}

fn translate_inner(
    request: &SearchRequest,
    allowlist: &Allowlist,
) -> Result<SqlQuery, TranslationError> {
    let (base_table, base_alias) = split_table_ref(&request.from, "from")?;
    allowlist.check_table(&base_table)?;

    // The base table's alias must be in place before any column resolves.
    let mut aliases: HashMap<String, String> = HashMap::new();
    aliases.insert(base_alias.clone(), base_table.clone());

    let mut joins = Vec::with_capacity(request.joins.len());
    for join in &request.joins {
        let (table, alias) = split_table_ref(&join.table, "join")?;
        allowlist.check_table(&table)?;
        let join_type = JoinType::parse(&join.join_type).ok_or_else(|| {
            TranslationError::MalformedClause(format!("unknown join type: {}", join.join_type))
        })?;
        aliases.insert(alias.clone(), table.clone());
        joins.push((join_type, table, alias, join.on.as_str()));
    }

    if request.source.is_empty() {
        return Err(TranslationError::MalformedClause(
            "_source must list at least one column".to_string(),
        ));
    }
    for entry in &request.source {
        resolve_source_column(entry, &aliases, allowlist)?;
    }

    let mut sql = format!("SELECT {} FROM ", request.source.join(", "));
    push_table(&mut sql, &base_table, &base_alias);
    let mut params = Vec::new();

    for (join_type, table, alias, on_text) in &joins {
        sql.push(' ');
        sql.push_str(join_type.as_sql());
        sql.push(' ');
        push_table(&mut sql, table, alias);
        sql.push_str(" ON ");

        let condition = relq_ast::parse_condition(on_text)?;
        check_on_condition(&condition, table, &aliases, allowlist)?;
        relq_sql::render_condition(&condition, &mut sql, &mut params);
    }

    let must = request
        .query
        .as_ref()
        .map(|q| q.bool_clause.must.as_slice())
        .unwrap_or_default();
    if !must.is_empty() {
        sql.push_str(" WHERE ");
        let mut first = true;
        for clause in must {
            render_must_clause(
                clause,
                &base_table,
                &aliases,
                allowlist,
                &mut sql,
                &mut params,
                &mut first,
            )?;
        }
    }

    if let Some(size) = request.size {
        sql.push_str(&format!(" LIMIT {size}"));
    }
    if let Some(offset) = request.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok(SqlQuery { sql, params })
}

fn render_must_clause(
    clause: &MustClause,
    base_table: &str,
    aliases: &HashMap<String, String>,
    allowlist: &Allowlist,
    sql: &mut String,
    params: &mut Vec<serde_json::Value>,
    first: &mut bool,
) -> Result<(), TranslationError> {
    match clause {
        MustClause::Match(entries) => {
            if entries.is_empty() {
                return Err(TranslationError::MalformedClause(
                    "empty match clause".to_string(),
                ));
            }
            for (column, value) in entries {
                resolve_filter_column(column, base_table, aliases, allowlist)?;
                push_separator(sql, first);
                params.push(value.clone());
                sql.push_str(&format!("{column} = ${}", params.len()));
            }
        }
        MustClause::Range(entries) => {
            if entries.is_empty() {
                return Err(TranslationError::MalformedClause(
                    "empty range clause".to_string(),
                ));
            }
            for (column, bounds) in entries {
                resolve_filter_column(column, base_table, aliases, allowlist)?;
                if bounds.is_empty() {
                    return Err(TranslationError::MalformedClause(format!(
                        "range clause for {column} has no bounds"
                    )));
                }
                for (operator, value) in bounds {
                    let sql_op = match operator.as_str() {
                        "gte" => ">=",
                        "lte" => "<=",
                        "gt" => ">",
                        "lt" => "<",
                        other => {
                            return Err(TranslationError::UnsupportedOperator(other.to_string()))
                        }
                    };
                    push_separator(sql, first);
                    params.push(value.clone());
                    sql.push_str(&format!("{column} {sql_op} ${}", params.len()));
                }
            }
        }
    }
    Ok(())
}

/// Split `"table"` / `"table alias"`; the alias defaults to the table name.
fn split_table_ref(text: &str, clause: &str) -> Result<(String, String), TranslationError> {
    let mut parts = text.split_whitespace();
    let table = parts
        .next()
        .ok_or_else(|| TranslationError::MalformedClause(format!("empty {clause} table")))?;
    let alias = parts.next().unwrap_or(table);
    if parts.next().is_some() {
        return Err(TranslationError::MalformedClause(format!(
            "{clause} table must be \"table\" or \"table alias\": {text}"
        )));
    }
    if !is_ident(table) || !is_ident(alias) {
        return Err(TranslationError::MalformedClause(format!(
            "invalid {clause} table reference: {text}"
        )));
    }
    Ok((table.to_string(), alias.to_string()))
}

// Aliases are not allowlist-checked, so they must at least be identifiers
// before they reach SQL text.
fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `_source` entries must be exactly `alias.column`.
fn resolve_source_column(
    entry: &str,
    aliases: &HashMap<String, String>,
    allowlist: &Allowlist,
) -> Result<(), ValidationError> {
    let (alias, column) = match entry.split_once('.') {
        Some((alias, column))
            if !alias.is_empty() && !column.is_empty() && !column.contains('.') =>
        {
            (alias, column)
        }
        _ => return Err(ValidationError::InvalidColumnFormat(entry.to_string())),
    };
    let table = aliases
        .get(alias)
        .ok_or_else(|| ValidationError::UnknownAlias(alias.to_string()))?;
    allowlist.check_column(table, column)
}

/// Filter columns may be `alias.column` or a bare column on the base table.
fn resolve_filter_column(
    column: &str,
    base_table: &str,
    aliases: &HashMap<String, String>,
    allowlist: &Allowlist,
) -> Result<(), ValidationError> {
    match column.split_once('.') {
        Some((alias, name)) => {
            let table = aliases
                .get(alias)
                .ok_or_else(|| ValidationError::UnknownAlias(alias.to_string()))?;
            allowlist.check_column(table, name)
        }
        None => allowlist.check_column(base_table, column),
    }
}

/// Validate a parsed join condition: qualified columns resolve through the
/// alias map, unqualified ones against the join's own table.
fn check_on_condition(
    condition: &Condition,
    join_table: &str,
    aliases: &HashMap<String, String>,
    allowlist: &Allowlist,
) -> Result<(), TranslationError> {
    check_on_column(&condition.left, join_table, aliases, allowlist)?;
    if let Operand::Column(column) = &condition.right {
        check_on_column(column, join_table, aliases, allowlist)?;
    }
    Ok(())
}

fn check_on_column(
    column: &ColumnExpr,
    join_table: &str,
    aliases: &HashMap<String, String>,
    allowlist: &Allowlist,
) -> Result<(), TranslationError> {
    let table = match &column.qualifier {
        Some(alias) => aliases
            .get(alias)
            .ok_or_else(|| ValidationError::UnknownAlias(alias.clone()))?,
        None => join_table,
    };
    relq_sql::check_column(allowlist, table, column)?;
    Ok(())
}

fn push_table(sql: &mut String, table: &str, alias: &str) {
    sql.push_str(table);
    if alias != table {
        sql.push(' ');
        sql.push_str(alias);
    }
}

fn push_separator(sql: &mut String, first: &mut bool) {
    if *first {
        *first = false;
    } else {
        sql.push_str(" AND ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn allowlist() -> Allowlist {
        serde_yaml::from_str(
            r#"
orders:
  columns: [id, total, customer_id]
customers:
  columns: [id, name]
"#,
        )
        .unwrap()
    }

    fn request(value: serde_json::Value) -> SearchRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn alias_defaults_to_table_name() {
        let req = request(json!({ "from": "orders", "_source": ["orders.id"] }));
        let rendered = translate(&req, &allowlist()).unwrap();
        assert_eq!(rendered.sql, "SELECT orders.id FROM orders");
    }

    #[test]
    fn match_and_range_render_bound_conditions() {
        let req = request(json!({
            "from": "orders o",
            "_source": ["o.id", "o.total"],
            "query": { "bool": { "must": [
                { "match": { "o.customer_id": 7 } },
                { "range": { "o.total": { "gte": 100, "lt": 500 } } }
            ] } },
            "size": 10,
            "offset": 20
        }));
        let rendered = translate(&req, &allowlist()).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT o.id, o.total FROM orders o \
             WHERE o.customer_id = $1 AND o.total >= $2 AND o.total < $3 \
             LIMIT 10 OFFSET 20"
        );
        assert_eq!(rendered.params, vec![json!(7), json!(100), json!(500)]);
    }

    #[test]
    fn unknown_range_operator_is_fatal() {
        let req = request(json!({
            "from": "orders",
            "_source": ["orders.id"],
            "query": { "bool": { "must": [
                { "range": { "total": { "between": [1, 2] } } }
            ] } }
        }));
        assert!(matches!(
            translate(&req, &allowlist()),
            Err(TranslationError::UnsupportedOperator(op)) if op == "between"
        ));
    }

    #[test]
    fn numeric_from_fails_deserialization() {
        let result: Result<SearchRequest, _> =
            serde_json::from_value(json!({ "from": 20, "_source": ["o.id"] }));
        assert!(result.is_err());
    }

    #[test]
    fn clause_kind_is_decided_during_deserialization() {
        let result: Result<SearchRequest, _> = serde_json::from_value(json!({
            "from": "orders",
            "_source": ["orders.id"],
            "query": { "bool": { "must": [ { "fuzzy": { "total": 1 } } ] } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_source_entry_is_rejected() {
        for entry in ["id", "o.id.extra", ".id", "o."] {
            let req = request(json!({ "from": "orders o", "_source": [entry] }));
            assert!(
                matches!(
                    translate(&req, &allowlist()),
                    Err(TranslationError::Validation(
                        ValidationError::InvalidColumnFormat(_)
                    ))
                ),
                "{entry} should be rejected"
            );
        }
    }
}
