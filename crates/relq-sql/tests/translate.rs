//! End-to-end translation properties for the grammar front-end.

use relq_schema::{Allowlist, ValidationError};
use relq_sql::{translate, RenderMode, TranslateError};
use serde_json::json;

fn allowlist() -> Allowlist {
    serde_yaml::from_str(
        r#"
orders:
  columns: [id, total, customer_id, status]
  jsonb: ["meta->>'region'"]
customers:
  columns: [id, name]
"#,
    )
    .unwrap()
}

#[test]
fn end_to_end_example() {
    let rendered = translate(
        "SELECT id, meta->>'region' FROM orders WHERE total > 100 LIMIT 10;",
        &allowlist(),
        RenderMode::Rows,
    )
    .unwrap();
    assert_eq!(
        rendered.sql,
        "SELECT id, meta ->> 'region' FROM orders WHERE total > $1 LIMIT 10;"
    );
    assert_eq!(rendered.params, vec![json!(100)]);
}

#[test]
fn unlisted_table_produces_no_sql() {
    let result = translate("SELECT id FROM payments", &allowlist(), RenderMode::Rows);
    assert!(matches!(
        result,
        Err(TranslateError::Validation(ValidationError::TableNotAllowed(table))) if table == "payments"
    ));
}

#[test]
fn unlisted_table_via_join_produces_no_sql() {
    let result = translate(
        "SELECT id FROM orders JOIN payments p ON p.id = p.id",
        &allowlist(),
        RenderMode::Rows,
    );
    assert!(matches!(
        result,
        Err(TranslateError::Validation(ValidationError::TableNotAllowed(table))) if table == "payments"
    ));
}

#[test]
fn allowed_pair_renders_literally() {
    let rendered = translate(
        "SELECT o.id FROM orders o WHERE o.total >= 50",
        &allowlist(),
        RenderMode::Rows,
    )
    .unwrap();
    assert!(rendered.sql.contains("o.id"));
    assert!(rendered.sql.contains("o.total >= $1"));
}

#[test]
fn count_mode_invariance() {
    let sources = [
        "SELECT id FROM orders",
        "SELECT id FROM orders ORDER BY total DESC",
        "SELECT id FROM orders WHERE total > 1 ORDER BY total LIMIT 5 OFFSET 10",
    ];
    for source in sources {
        let rendered = translate(source, &allowlist(), RenderMode::Count).unwrap();
        assert!(rendered.sql.starts_with("SELECT COUNT(*) FROM orders"));
        assert!(!rendered.sql.contains("ORDER BY"));
        assert!(!rendered.sql.contains("LIMIT"));
        assert!(!rendered.sql.contains("OFFSET"));
    }
}

#[test]
fn join_types_normalize_to_spaced_keywords() {
    for (source_kw, rendered_kw) in [
        ("JOIN", "JOIN"),
        ("INNER JOIN", "INNER JOIN"),
        ("INNERJOIN", "INNER JOIN"),
        ("LEFT JOIN", "LEFT JOIN"),
        ("LEFTJOIN", "LEFT JOIN"),
    ] {
        let source = format!("SELECT id FROM orders {source_kw} customers c ON name = 'Ada'");
        let rendered = translate(&source, &allowlist(), RenderMode::Rows).unwrap();
        assert!(
            rendered.sql.contains(&format!("{rendered_kw} customers c")),
            "{source_kw} should render as {rendered_kw}: {}",
            rendered.sql
        );
    }
}

#[test]
fn syntax_error_carries_position_context() {
    let err = translate("SELEC id FROM orders", &allowlist(), RenderMode::Rows).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("syntax error"), "unexpected message: {message}");
}
