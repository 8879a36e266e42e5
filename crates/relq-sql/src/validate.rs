//! Allowlist-validating tree-walker
//!
//! Walks a parse tree depth-first and checks every table, column and JSONB
//! reference against the schema allowlist before any SQL is emitted. The
//! first violation aborts the walk; no partial result escapes.

use relq_ast::{ColumnExpr, Condition, Operand, Query};
use relq_schema::{Allowlist, ValidationError};

/// Compact JSONB path text in the allowlist's authored convention: the bare
/// column followed by its access chain, no spaces, keys single-quoted with
/// embedded quotes doubled (`payload->>'status'`). Qualifiers are not part
/// of the authored form.
pub fn jsonb_lookup_key(column: &ColumnExpr) -> String {
    let mut text = column.name.clone();
    for step in &column.path {
        text.push_str(step.op.as_sql());
        text.push('\'');
        text.push_str(&step.key.replace('\'', "''"));
        text.push('\'');
    }
    text
}

/// Check one column reference against the given table's rules.
pub fn check_column(
    allowlist: &Allowlist,
    table: &str,
    column: &ColumnExpr,
) -> Result<(), ValidationError> {
    if column.is_jsonb() {
        allowlist.check_jsonb_field(table, &jsonb_lookup_key(column))
    } else {
        allowlist.check_column(table, &column.name)
    }
}

fn check_condition(
    allowlist: &Allowlist,
    table: &str,
    condition: &Condition,
) -> Result<(), ValidationError> {
    check_column(allowlist, table, &condition.left)?;
    if let Operand::Column(column) = &condition.right {
        check_column(allowlist, table, column)?;
    }
    Ok(())
}

/// Validate a parse tree against the allowlist.
///
/// Table context is scoped to the nearest enclosing FROM/JOIN: the select
/// list and WHERE conditions are checked against the FROM table, each ON
/// condition against its join's table.
pub fn validate(query: &Query, allowlist: &Allowlist) -> Result<(), ValidationError> {
    allowlist.check_table(&query.from.name)?;

    for join in &query.joins {
        allowlist.check_table(&join.table.name)?;
        check_condition(allowlist, &join.table.name, &join.on)?;
    }

    for item in &query.select {
        check_column(allowlist, &query.from.name, &item.column)?;
    }

    for condition in &query.conditions {
        check_condition(allowlist, &query.from.name, condition)?;
    }

    // ORDER BY, LIMIT and OFFSET carry no checks today. Extend here to
    // tighten per-clause policy.

    Ok(())
}
