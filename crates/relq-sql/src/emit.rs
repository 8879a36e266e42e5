//! SQL-emitting tree-walker
//!
//! Renders a validated parse tree into SQL text in source order. Literal
//! values bind as `$n` placeholders with a parallel parameter list; only
//! allowlist-checked identifiers are interpolated as raw text.

use relq_ast::{ColumnExpr, Condition, Literal, Operand, Query, SelectItem, TableRef};
use serde::Serialize;
use serde_json::json;

/// Per-request rendering variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Row-returning query, rendered clause by clause.
    #[default]
    Rows,
    /// Row-count query: the select list becomes `COUNT(*)` and ORDER BY,
    /// LIMIT and OFFSET are suppressed.
    Count,
}

/// Finished translation: SQL text plus positionally-bound parameters.
#[derive(Debug, Clone, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<serde_json::Value>,
}

/// Render a validated parse tree.
pub fn render(query: &Query, mode: RenderMode) -> SqlQuery {
    let mut sql = String::from("SELECT ");
    let mut params = Vec::new();

    match mode {
        RenderMode::Count => sql.push_str("COUNT(*)"),
        RenderMode::Rows => {
            let items: Vec<String> = query.select.iter().map(render_select_item).collect();
            sql.push_str(&items.join(", "));
        }
    }

    sql.push_str(" FROM ");
    sql.push_str(&render_table_ref(&query.from));

    for join in &query.joins {
        sql.push(' ');
        sql.push_str(join.join_type.as_sql());
        sql.push(' ');
        sql.push_str(&render_table_ref(&join.table));
        sql.push_str(" ON ");
        render_condition(&join.on, &mut sql, &mut params);
    }

    if !query.conditions.is_empty() {
        sql.push_str(" WHERE ");
        for (i, condition) in query.conditions.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            render_condition(condition, &mut sql, &mut params);
        }
    }

    if mode == RenderMode::Rows {
        if !query.order.is_empty() {
            sql.push_str(" ORDER BY ");
            let keys: Vec<String> = query
                .order
                .iter()
                .map(|key| {
                    let mut text = render_column(&key.column);
                    if key.desc {
                        text.push_str(" DESC");
                    }
                    text
                })
                .collect();
            sql.push_str(&keys.join(", "));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    if query.semicolon {
        sql.push(';');
    }

    SqlQuery { sql, params }
}

fn render_select_item(item: &SelectItem) -> String {
    let mut text = render_column(&item.column);
    if let Some(alias) = &item.alias {
        text.push_str(" AS ");
        text.push_str(alias);
    }
    text
}

/// Render a column reference, including its JSONB access chain. The access
/// operator is spaced and keys re-quote with embedded quotes doubled.
pub fn render_column(column: &ColumnExpr) -> String {
    let mut text = match &column.qualifier {
        Some(qualifier) => format!("{qualifier}.{}", column.name),
        None => column.name.clone(),
    };
    for step in &column.path {
        text.push(' ');
        text.push_str(step.op.as_sql());
        text.push_str(" '");
        text.push_str(&step.key.replace('\'', "''"));
        text.push('\'');
    }
    text
}

fn render_table_ref(table: &TableRef) -> String {
    let mut text = match &table.schema {
        Some(schema) => format!("{schema}.{}", table.name),
        None => table.name.clone(),
    };
    if let Some(alias) = &table.alias {
        text.push(' ');
        text.push_str(alias);
    }
    text
}

/// Render one condition into `sql`, pushing bound values onto `params`.
/// Column aliases never apply here; a right-hand column renders as literal
/// text while a right-hand value becomes the next `$n` placeholder.
pub fn render_condition(
    condition: &Condition,
    sql: &mut String,
    params: &mut Vec<serde_json::Value>,
) {
    sql.push_str(&render_column(&condition.left));
    sql.push(' ');
    sql.push_str(condition.op.as_sql());
    sql.push(' ');
    match &condition.right {
        Operand::Column(column) => sql.push_str(&render_column(column)),
        Operand::Value(literal) => {
            params.push(literal_param(literal));
            sql.push_str(&format!("${}", params.len()));
        }
    }
}

fn literal_json(literal: &Literal) -> serde_json::Value {
    match literal {
        Literal::String(s) => json!(s),
        Literal::Int(n) => json!(n),
        Literal::Float(f) => json!(f),
        Literal::Bool(b) => json!(b),
        Literal::Object(fields) => {
            let map: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(key, value)| (key.clone(), literal_json(value)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

// JSONB object literals travel as JSON text so the driver can cast them;
// scalars bind as themselves.
fn literal_param(literal: &Literal) -> serde_json::Value {
    match literal {
        Literal::Object(_) => serde_json::Value::String(literal_json(literal).to_string()),
        other => literal_json(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_clauses_in_source_order() {
        let query = relq_ast::parse(
            "SELECT o.id, total AS amount FROM sales.orders o \
             LEFT JOIN customers c ON o.customer_id = c.id \
             WHERE total > 100 AND status = 'open' \
             ORDER BY total DESC LIMIT 10 OFFSET 20;",
        )
        .unwrap();
        let rendered = render(&query, RenderMode::Rows);
        assert_eq!(
            rendered.sql,
            "SELECT o.id, total AS amount FROM sales.orders o \
             LEFT JOIN customers c ON o.customer_id = c.id \
             WHERE total > $1 AND status = $2 \
             ORDER BY total DESC LIMIT 10 OFFSET 20;"
        );
        assert_eq!(rendered.params, vec![json!(100), json!("open")]);
    }

    #[test]
    fn jsonb_access_is_spaced_and_escaped() {
        let query = relq_ast::parse("SELECT payload->'a'->>'it''s' FROM events").unwrap();
        let rendered = render(&query, RenderMode::Rows);
        assert_eq!(
            rendered.sql,
            "SELECT payload -> 'a' ->> 'it''s' FROM events"
        );
    }

    #[test]
    fn count_mode_suppresses_ordering_and_pagination() {
        let query = relq_ast::parse(
            "SELECT id FROM orders WHERE total > 100 ORDER BY total LIMIT 10 OFFSET 5",
        )
        .unwrap();
        let rendered = render(&query, RenderMode::Count);
        assert_eq!(rendered.sql, "SELECT COUNT(*) FROM orders WHERE total > $1");
        assert!(!rendered.sql.contains("ORDER BY"));
        assert!(!rendered.sql.contains("LIMIT"));
        assert!(!rendered.sql.contains("OFFSET"));
        assert_eq!(rendered.params, vec![json!(100)]);
    }

    #[test]
    fn column_comparison_renders_as_text_not_parameter() {
        let query = relq_ast::parse("SELECT id FROM orders WHERE region = home_region").unwrap();
        let rendered = render(&query, RenderMode::Rows);
        assert_eq!(rendered.sql, "SELECT id FROM orders WHERE region = home_region");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn jsonb_object_value_binds_as_json_text() {
        let query = relq_ast::parse("SELECT id FROM orders WHERE meta = {'region': 'EU'}").unwrap();
        let rendered = render(&query, RenderMode::Rows);
        assert_eq!(rendered.sql, "SELECT id FROM orders WHERE meta = $1");
        assert_eq!(rendered.params, vec![json!(r#"{"region":"EU"}"#)]);
    }

    #[test]
    fn concatenated_join_keyword_renders_spaced() {
        let query =
            relq_ast::parse("SELECT id FROM orders INNERJOIN customers c ON c.id = c.id").unwrap();
        let rendered = render(&query, RenderMode::Rows);
        assert!(rendered.sql.contains("INNER JOIN customers c ON c.id = c.id"));
    }
}
