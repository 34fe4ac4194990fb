//! Request Routing
//!
//! Maps `/api/chunk/*` requests onto [`ChunkStore`] calls and store errors
//! onto status codes. Store calls block, so they run on tokio's blocking
//! pool.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::codec;
use crate::error::{Error, Result};
use crate::monitoring::SERVICE_NAME;
use crate::store::ChunkStore;

const JSON: &str = "application/json";

const LEGACY_OBJECT_ID: &str = "imagenId";

const KNOWN_PATHS: &[&str] = &[
    "/api/chunk/write",
    "/api/chunk/read",
    "/api/chunk/delete",
    "/api/chunk/deleteAll",
    "/api/chunk/exists",
    "/api/chunk/stats",
    "/api/chunk/health",
    "/healthz",
    "/livez",
    "/readyz",
    "/metrics",
];

/// Routed response, converted to hyper at the connection edge
#[derive(Debug)]
pub struct ApiResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Content type
    pub content_type: HeaderValue,
    /// Response body
    pub body: Bytes,
}

impl ApiResponse {
    /// JSON response
    pub fn json(status: StatusCode, value: Value) -> Self {
        Self {
            status,
            content_type: HeaderValue::from_static(JSON),
            body: Bytes::from(value.to_string()),
        }
    }

    /// JSON error body `{status: "error", message}`
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(
            status,
            json!({ "status": "error", "message": message.into() }),
        )
    }

    /// Map a store error to its status code
    pub fn from_error(err: &Error) -> Self {
        let status = match err {
            Error::Validation(_) | Error::Encoding { .. } => StatusCode::BAD_REQUEST,
            Error::ChunkNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::error(status, err.to_string())
    }

    /// Parse the body as JSON (tests and clients)
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Convert into a hyper response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, self.content_type);
        response
    }
}

type Handled = std::result::Result<ApiResponse, ApiResponse>;

/// Route one request
pub async fn dispatch(
    state: &Arc<AppState>,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> ApiResponse {
    let handled = match (method, path) {
        (&Method::POST, "/api/chunk/write") => write_chunk(state, body).await,
        (&Method::GET, "/api/chunk/read") => read_chunk(state, query).await,
        (&Method::DELETE, "/api/chunk/delete") => delete_chunk(state, query).await,
        (&Method::DELETE, "/api/chunk/deleteAll") => delete_all_chunks(state, query).await,
        (&Method::GET, "/api/chunk/exists") => chunk_exists(state, query).await,
        (&Method::GET, "/api/chunk/stats") => stats(state).await,
        (&Method::GET, "/api/chunk/health") => Ok(chunk_health(state)),
        (&Method::GET, "/healthz") | (&Method::GET, "/livez") => Ok(liveness(state)),
        (&Method::GET, "/readyz") => Ok(readiness(state)),
        (&Method::GET, "/metrics") => metrics(state),
        (_, p) if KNOWN_PATHS.contains(&p) => Err(ApiResponse::error(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{} not allowed on {}", method, p),
        )),
        _ => Err(ApiResponse::error(StatusCode::NOT_FOUND, "not found")),
    };

    handled.unwrap_or_else(|response| response)
}

// =============================================================================
// Chunk handlers
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest {
    #[serde(alias = "imagenId")]
    object_id: Option<String>,
    chunk_index: Option<i64>,
    data: Option<String>,
}

async fn write_chunk(state: &Arc<AppState>, body: Bytes) -> Handled {
    let request: WriteRequest = serde_json::from_slice(&body).map_err(|e| {
        ApiResponse::error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
    })?;

    let (Some(object_id), Some(chunk_index), Some(data)) =
        (request.object_id, request.chunk_index, request.data)
    else {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "objectId, chunkIndex and data are required",
        ));
    };
    let chunk_index = to_chunk_index(chunk_index)?;

    blocking(state, move |store| {
        store.write_encoded(&object_id, chunk_index, &data)
    })
    .await?;

    Ok(ApiResponse::json(
        StatusCode::OK,
        json!({ "status": "success", "message": "Chunk stored" }),
    ))
}

async fn read_chunk(state: &Arc<AppState>, query: Option<&str>) -> Handled {
    let params = parse_query(query)?;
    let object_id = object_id_param(&params)?;
    let chunk_index = chunk_index_param(&params)?;

    let id = object_id.clone();
    let data = blocking(state, move |store| store.read(&id, chunk_index)).await?;

    Ok(ApiResponse::json(
        StatusCode::OK,
        json!({
            "status": "success",
            "objectId": object_id,
            "chunkIndex": chunk_index,
            "data": codec::encode_payload(&data),
            "size": data.len(),
        }),
    ))
}

async fn delete_chunk(state: &Arc<AppState>, query: Option<&str>) -> Handled {
    let params = parse_query(query)?;
    let object_id = object_id_param(&params)?;
    let chunk_index = chunk_index_param(&params)?;

    let removed = blocking(state, move |store| store.delete(&object_id, chunk_index)).await?;

    Ok(ApiResponse::json(
        StatusCode::OK,
        json!({
            "status": "success",
            "message": if removed { "Chunk deleted" } else { "Chunk not present" },
            "removed": removed,
        }),
    ))
}

async fn delete_all_chunks(state: &Arc<AppState>, query: Option<&str>) -> Handled {
    let params = parse_query(query)?;
    let object_id = object_id_param(&params)?;

    let deleted = blocking(state, move |store| store.delete_all(&object_id)).await?;

    Ok(ApiResponse::json(
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "All chunks deleted",
            "deleted": deleted,
        }),
    ))
}

async fn chunk_exists(state: &Arc<AppState>, query: Option<&str>) -> Handled {
    let params = parse_query(query)?;
    let object_id = object_id_param(&params)?;
    let chunk_index = chunk_index_param(&params)?;

    let id = object_id.clone();
    let exists = blocking(state, move |store| store.exists(&id, chunk_index)).await?;

    Ok(ApiResponse::json(
        StatusCode::OK,
        json!({
            "exists": exists,
            "objectId": object_id,
            "chunkIndex": chunk_index,
        }),
    ))
}

async fn stats(state: &Arc<AppState>) -> Handled {
    let stats = blocking(state, |store| store.stats()).await?;
    let value = serde_json::to_value(&stats)
        .map_err(|e| ApiResponse::from_error(&Error::Internal(e.to_string())))?;
    Ok(ApiResponse::json(StatusCode::OK, value))
}

// =============================================================================
// Health & metrics
// =============================================================================

fn chunk_health(state: &Arc<AppState>) -> ApiResponse {
    let storage = state.store.health_check();
    let (status, label) = if storage.status.is_operational() {
        (StatusCode::OK, "UP")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DOWN")
    };
    ApiResponse::json(
        status,
        json!({
            "status": label,
            "service": SERVICE_NAME,
            "nodeId": state.store.node_id(),
        }),
    )
}

fn liveness(state: &Arc<AppState>) -> ApiResponse {
    let check = state.health.liveness_check();
    let status = if check.status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::json(status, serde_json::to_value(&check).unwrap_or(Value::Null))
}

fn readiness(state: &Arc<AppState>) -> ApiResponse {
    let response = state
        .health
        .check_all(state.store.node_id(), state.store.health_check());
    let status = if state.health.is_ready() && response.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::json(
        status,
        serde_json::to_value(&response).unwrap_or(Value::Null),
    )
}

fn metrics(state: &Arc<AppState>) -> Handled {
    let (content_type, body) = state
        .store
        .metrics()
        .encode()
        .map_err(|e| ApiResponse::from_error(&e))?;
    Ok(ApiResponse {
        status: StatusCode::OK,
        content_type: HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("text/plain")),
        body: Bytes::from(body),
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Run a store call on the blocking pool
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> std::result::Result<T, ApiResponse>
where
    T: Send + 'static,
    F: FnOnce(&ChunkStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || f(&store))
        .await
        .unwrap_or_else(|e| Err(Error::Internal(format!("store task failed: {}", e))));
    result.map_err(|e| ApiResponse::from_error(&e))
}

/// Parse and percent-decode a query string
fn parse_query(query: Option<&str>) -> std::result::Result<HashMap<String, String>, ApiResponse> {
    let mut params = HashMap::new();
    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(&value.replace('+', " "))
            .map_err(|_| {
                ApiResponse::error(
                    StatusCode::BAD_REQUEST,
                    format!("Parameter {} is not valid UTF-8", name),
                )
            })?
            .into_owned();
        params.insert(name.to_string(), value);
    }
    Ok(params)
}

fn required(
    params: &HashMap<String, String>,
    name: &str,
) -> std::result::Result<String, ApiResponse> {
    params.get(name).cloned().ok_or_else(|| {
        ApiResponse::error(
            StatusCode::BAD_REQUEST,
            format!("Missing parameter {}", name),
        )
    })
}

/// `objectId`, or `imagenId` as sent by older clients
fn object_id_param(params: &HashMap<String, String>) -> std::result::Result<String, ApiResponse> {
    match params.get(LEGACY_OBJECT_ID) {
        Some(id) if !params.contains_key("objectId") => Ok(id.clone()),
        _ => required(params, "objectId"),
    }
}

fn chunk_index_param(params: &HashMap<String, String>) -> std::result::Result<u32, ApiResponse> {
    let raw = required(params, "chunkIndex")?;
    let value: i64 = raw.trim().parse().map_err(|_| {
        ApiResponse::error(
            StatusCode::BAD_REQUEST,
            format!("chunkIndex '{}' is not an integer", raw),
        )
    })?;
    to_chunk_index(value)
}

fn to_chunk_index(value: i64) -> std::result::Result<u32, ApiResponse> {
    u32::try_from(value).map_err(|_| {
        ApiResponse::from_error(&Error::Validation(format!(
            "chunkIndex {} is out of range (0..={})",
            value,
            u32::MAX
        )))
    })
}

// =============================================================================
// Tests
// =============================================================================
