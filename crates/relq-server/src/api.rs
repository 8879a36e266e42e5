//! HTTP boundary
//!
//! Accepts both query forms and returns the generated SQL plus its bound
//! parameters. The server never executes the SQL; execution belongs to the
//! caller.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use relq_schema::Allowlist;
use relq_search::SearchRequest;
use relq_sql::{RenderMode, SqlQuery};

pub struct AppState {
    pub allowlist: Allowlist,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/query", post(translate_query))
        .route("/api/search", post(translate_search))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,

    /// Ask for the row-count variant instead of rows.
    #[serde(default)]
    count: bool,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    sql: String,
    params: Vec<serde_json::Value>,
}

impl From<SqlQuery> for TranslateResponse {
    fn from(rendered: SqlQuery) -> Self {
        Self {
            sql: rendered.sql,
            params: rendered.params,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(err: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

async fn translate_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let mode = if request.count {
        RenderMode::Count
    } else {
        RenderMode::Rows
    };
    relq_sql::translate(&request.query, &state.allowlist, mode)
        .map(|rendered| Json(rendered.into()))
        .map_err(bad_request)
}

async fn translate_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    relq_search::translate(&request, &state.allowlist)
        .map(|rendered| Json(rendered.into()))
        .map_err(bad_request)
}
