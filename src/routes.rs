//! Conventional route generation: a collection route (GET, POST) and an
//! item-by-id route (PATCH, DELETE) per resource.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::endpoint::{CrudEndpoint, Verb};
use crate::errors::ApiError;

/// Type constraint for the `{id}` path segment. A segment that does not
/// parse behaves like a router miss: 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Int,
    Uuid,
    Str,
}

impl IdKind {
    /// Parse a raw path segment into a bind-ready JSON value.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<Value> {
        match self {
            Self::Int => raw.parse::<i64>().ok().map(Value::from),
            Self::Uuid => uuid::Uuid::parse_str(raw)
                .ok()
                .map(|u| Value::String(u.to_string())),
            Self::Str => Some(Value::String(raw.to_string())),
        }
    }
}

#[derive(Clone)]
struct RouteState {
    endpoint: Arc<CrudEndpoint>,
    id_kind: IdKind,
}

/// Generate the two conventional routes for a resource:
///
/// - `<path>` accepts GET and POST
/// - `<path>/{id}` accepts PATCH and DELETE, with the id constrained to
///   `id_kind`
///
/// # Panics
///
/// Panics if `path` ends with `/` — a construction-time misconfiguration.
#[must_use]
pub fn crud_routes(path: &str, endpoint: Arc<CrudEndpoint>, id_kind: IdKind) -> Router {
    assert!(!path.ends_with('/'), "path must not end with '/'");

    let state = RouteState { endpoint, id_kind };
    Router::new()
        .route(&format!("{path}/{{id}}"), patch(update_one).delete(delete_one))
        .route(path, get(read_all).post(create_one))
        .with_state(state)
}

async fn create_one(
    State(state): State<RouteState>,
    Query(query): Query<Vec<(String, String)>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    require(&state, Verb::Post)?;
    let result = state.endpoint.create(body, query_map(query)).await?;
    Ok(Json(result))
}

async fn read_all(
    State(state): State<RouteState>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    require(&state, Verb::Get)?;
    let result = state.endpoint.read(query_map(query)).await?;
    Ok(Json(result))
}

async fn update_one(
    State(state): State<RouteState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    require(&state, Verb::Patch)?;
    let result = state
        .endpoint
        .update(body, path_params(&state, &id)?)
        .await?;
    Ok(Json(result))
}

async fn delete_one(
    State(state): State<RouteState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&state, Verb::Delete)?;
    state.endpoint.delete(path_params(&state, &id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require(state: &RouteState, verb: Verb) -> Result<(), ApiError> {
    if state.endpoint.supports(verb) {
        Ok(())
    } else {
        Err(ApiError::custom(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
            None,
        ))
    }
}

fn path_params(state: &RouteState, raw_id: &str) -> Result<Map<String, Value>, ApiError> {
    let id = state
        .id_kind
        .parse(raw_id)
        .ok_or_else(|| ApiError::custom(StatusCode::NOT_FOUND, "Not Found", None))?;
    let mut params = Map::new();
    params.insert("id".to_string(), id);
    Ok(params)
}

/// Query parameters as an insertion-ordered JSON object. Values arrive as
/// strings; the query schema coerces declared types.
fn query_map(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect()
}
