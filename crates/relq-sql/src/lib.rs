//! Tree-walkers for the grammar front-end
//!
//! Two passes over one parse tree: the allowlist-validating walker, which
//! must succeed before any text is produced, and the SQL emitter, which
//! renders the tree with positionally-bound parameters. [`translate`] chains
//! parse, validate and render into the full pipeline.

use thiserror::Error;
use tracing::{debug, warn};

pub mod emit;
pub mod validate;

pub use emit::{render, render_column, render_condition, RenderMode, SqlQuery};
pub use validate::{check_column, jsonb_lookup_key, validate};

use relq_ast::ParseError;
use relq_schema::{Allowlist, ValidationError};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Translate query text into SQL: parse, validate against the allowlist,
/// then render. Fails before producing any SQL on the first violation.
pub fn translate(
    source: &str,
    allowlist: &Allowlist,
    mode: RenderMode,
) -> Result<SqlQuery, TranslateError> {
    let query = relq_ast::parse(source)?;

    if let Err(err) = validate(&query, allowlist) {
        warn!(error = %err, "query rejected");
        return Err(err.into());
    }

    let rendered = render(&query, mode);
    debug!(sql = %rendered.sql, params = rendered.params.len(), "query translated");
    Ok(rendered)
}
