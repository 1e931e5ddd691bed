use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

use hookbin_store::RawCapture;

use crate::models::*;
use crate::AppState;

/// Largest request body the capture path will buffer. Oversized bodies are
/// captured with the body recorded as absent rather than rejected.
const MAX_CAPTURE_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create a new capture endpoint
#[utoipa::path(
    post,
    path = "/api/endpoints",
    responses(
        (status = 201, description = "Endpoint created", body = CreateEndpointResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn create_endpoint(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CreateEndpointResponse>), (StatusCode, Json<ErrorResponse>)> {
    let endpoint_id = state.store.create_endpoint().map_err(|e| {
        warn!("Endpoint creation failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to create endpoint".to_string(),
                code: Some("ENDPOINT_CREATE_FAILED".to_string()),
            }),
        )
    })?;

    info!(endpoint_id = %endpoint_id, "Created capture endpoint");

    let url = format!("{}/hook/{}", state.public_base_url, endpoint_id);
    Ok((
        StatusCode::CREATED,
        Json(CreateEndpointResponse { endpoint_id, url }),
    ))
}

/// Capture one inbound webhook request
///
/// Accepts every HTTP method uniformly and never rejects on content: the
/// request is normalized and appended to the endpoint's history, and the
/// endpoint is auto-provisioned if it does not exist yet. Registered under
/// `axum::routing::any`, so the `post` annotation below is representative.
#[utoipa::path(
    post,
    path = "/hook/{id}",
    params(
        ("id" = String, Path, description = "Endpoint ID")
    ),
    responses(
        (status = 200, description = "Request captured", body = CaptureAck),
        (status = 500, description = "Capture failed", body = ErrorResponse)
    ),
    tag = "capture"
)]
pub async fn capture(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<CaptureAck>, (StatusCode, Json<ErrorResponse>)> {
    let (parts, body) = request.into_parts();

    let headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let client_address = header_value(&headers, "x-forwarded-for")
        .or_else(|| header_value(&headers, "x-real-ip"));
    let client_agent = header_value(&headers, "user-agent");

    // A body that fails to read (client abort, over the buffer limit) is
    // recorded as absent; the capture itself still succeeds.
    let body: Option<Bytes> = axum::body::to_bytes(body, MAX_CAPTURE_BODY_BYTES)
        .await
        .ok();

    let raw = RawCapture {
        method: parts.method.as_str().to_string(),
        headers,
        raw_query: parts.uri.query().map(str::to_string),
        body,
        client_address,
        client_agent,
    };

    let event_id = state.store.record_event(&id, raw).map_err(|e| {
        warn!(endpoint_id = %id, "Webhook capture failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to capture webhook".to_string(),
                code: Some("CAPTURE_FAILED".to_string()),
            }),
        )
    })?;

    debug!(endpoint_id = %id, event_id = %event_id, "Captured webhook");

    Ok(Json(CaptureAck {
        success: true,
        event_id,
        message: "Webhook captured successfully".to_string(),
    }))
}

/// List captured events for an endpoint
#[utoipa::path(
    get,
    path = "/api/endpoints/{id}/events",
    params(
        ("id" = String, Path, description = "Endpoint ID"),
        ("limit" = Option<usize>, Query, description = "Maximum events to return (default: 50, max: 100)")
    ),
    responses(
        (status = 200, description = "Captured events, newest first", body = EventList)
    ),
    tag = "endpoints"
)]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<EventListQuery>,
) -> Json<EventList> {
    debug!(endpoint_id = %id, limit = ?query.limit, "Listing captured events");

    // Unknown endpoints list as empty on purpose: a client polling before
    // any webhook has arrived sees a stable empty state, not an error.
    let events: Vec<Event> = state
        .store
        .list_events(&id, query.limit)
        .into_iter()
        .map(Event::from)
        .collect();

    let limit = query
        .limit
        .unwrap_or(hookbin_store::DEFAULT_LIST_LIMIT)
        .min(state.store.capacity());

    Json(EventList {
        count: events.len(),
        limit,
        events,
    })
}

/// Full event history for an endpoint (up to the retention cap)
#[utoipa::path(
    get,
    path = "/api/endpoints/{id}",
    params(
        ("id" = String, Path, description = "Endpoint ID")
    ),
    responses(
        (status = 200, description = "Captured events, newest first", body = EventList)
    ),
    tag = "endpoints"
)]
pub async fn get_endpoint_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<EventList> {
    let capacity = state.store.capacity();
    let events: Vec<Event> = state
        .store
        .list_events(&id, Some(capacity))
        .into_iter()
        .map(Event::from)
        .collect();

    Json(EventList {
        count: events.len(),
        limit: capacity,
        events,
    })
}

/// Get endpoint creation metadata
#[utoipa::path(
    get,
    path = "/api/endpoints/{id}/meta",
    params(
        ("id" = String, Path, description = "Endpoint ID")
    ),
    responses(
        (status = 200, description = "Endpoint metadata", body = EndpointMetaResponse),
        (status = 404, description = "Endpoint not found", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn get_endpoint_meta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EndpointMetaResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.endpoint_meta(&id) {
        Some(meta) => Ok(Json(EndpointMetaResponse {
            endpoint_id: meta.endpoint_id,
            created_at: meta.created_at,
            event_count: meta.event_count,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Endpoint '{}' not found", id),
                code: Some("ENDPOINT_NOT_FOUND".to_string()),
            }),
        )),
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_endpoints: state.store.endpoint_count(),
    })
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}
