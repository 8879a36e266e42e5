//! Schema allowlist for the query gateway
//!
//! The allowlist is the single access-control gate: a table name maps to the
//! plain columns and JSONB field expressions a caller may reference. It is
//! built once at startup from configuration and shared read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Raised the moment an unauthorized or malformed reference is found.
///
/// Every variant carries the offending subject so the boundary can report it
/// without exposing anything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("table {0} is not allowed")]
    TableNotAllowed(String),

    #[error("column {column} is not allowed for table {table}")]
    ColumnNotAllowed { table: String, column: String },

    #[error("JSONB field {field} is not allowed for table {table}")]
    JsonbFieldNotAllowed { table: String, field: String },

    #[error("column reference {0} must have the form alias.column")]
    InvalidColumnFormat(String),

    #[error("unknown table alias: {0}")]
    UnknownAlias(String),
}

/// Per-table access rules.
///
/// JSONB fields are stored in the compact authored form, e.g.
/// `payload->>'status'`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRules {
    #[serde(default)]
    pub columns: BTreeSet<String>,

    #[serde(default)]
    pub jsonb: BTreeSet<String>,
}

/// Immutable allowlist snapshot.
///
/// Deserializes directly from the `allowlist` configuration section:
///
/// ```yaml
/// orders:
///   columns: [id, total]
///   jsonb: ["meta->>'region'"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowlist {
    tables: HashMap<String, TableRules>,
}

impl Allowlist {
    pub fn new(tables: HashMap<String, TableRules>) -> Self {
        Self { tables }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn is_table_allowed(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn is_column_allowed(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rules| rules.columns.contains(column))
    }

    pub fn is_jsonb_field_allowed(&self, table: &str, field: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rules| rules.jsonb.contains(field))
    }

    /// Fallible lookup for walkers that need the table to exist before
    /// descending into its columns.
    pub fn table(&self, table: &str) -> Result<&TableRules, ValidationError> {
        self.tables
            .get(table)
            .ok_or_else(|| ValidationError::TableNotAllowed(table.to_string()))
    }

    pub fn check_table(&self, table: &str) -> Result<(), ValidationError> {
        self.table(table).map(|_| ())
    }

    pub fn check_column(&self, table: &str, column: &str) -> Result<(), ValidationError> {
        if self.table(table)?.columns.contains(column) {
            Ok(())
        } else {
            Err(ValidationError::ColumnNotAllowed {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    pub fn check_jsonb_field(&self, table: &str, field: &str) -> Result<(), ValidationError> {
        if self.table(table)?.jsonb.contains(field) {
            Ok(())
        } else {
            Err(ValidationError::JsonbFieldNotAllowed {
                table: table.to_string(),
                field: field.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Allowlist {
        serde_yaml::from_str(
            r#"
orders:
  columns: [id, total]
  jsonb: ["meta->>'region'"]
customers:
  columns: [id, name]
"#,
        )
        .unwrap()
    }

    #[test]
    fn table_membership() {
        let allowlist = sample();
        assert!(allowlist.is_table_allowed("orders"));
        assert!(!allowlist.is_table_allowed("payments"));
        assert_eq!(
            allowlist.check_table("payments"),
            Err(ValidationError::TableNotAllowed("payments".to_string()))
        );
    }

    #[test]
    fn column_membership() {
        let allowlist = sample();
        assert!(allowlist.check_column("orders", "total").is_ok());
        assert_eq!(
            allowlist.check_column("orders", "secret"),
            Err(ValidationError::ColumnNotAllowed {
                table: "orders".to_string(),
                column: "secret".to_string(),
            })
        );
    }

    #[test]
    fn jsonb_membership_uses_compact_form() {
        let allowlist = sample();
        assert!(allowlist.check_jsonb_field("orders", "meta->>'region'").is_ok());
        assert_eq!(
            allowlist.check_jsonb_field("orders", "meta->>'ssn'"),
            Err(ValidationError::JsonbFieldNotAllowed {
                table: "orders".to_string(),
                field: "meta->>'ssn'".to_string(),
            })
        );
    }

    #[test]
    fn missing_table_fails_column_check_as_table_error() {
        let allowlist = sample();
        assert_eq!(
            allowlist.check_column("payments", "id"),
            Err(ValidationError::TableNotAllowed("payments".to_string()))
        );
    }
}
