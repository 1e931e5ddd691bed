use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use hookbin_store::CapturedEvent;

/// Response when creating a capture endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEndpointResponse {
    /// Unique endpoint identifier
    pub endpoint_id: String,
    /// Public URL webhook senders should target
    pub url: String,
}

/// Acknowledgment returned for every captured request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptureAck {
    /// Whether the capture was stored
    pub success: bool,
    /// Id of the stored event
    pub event_id: String,
    /// Human-readable confirmation
    pub message: String,
}

/// One captured HTTP request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Unique event id
    pub id: String,
    /// Endpoint this event belongs to
    pub endpoint_id: String,
    /// HTTP method as received (unknown verbs kept as-is)
    pub method: String,
    /// Request headers, duplicate names collapsed last-wins
    pub headers: HashMap<String, String>,
    /// Query parameters, last value wins per key
    pub query_params: HashMap<String, String>,
    /// Raw request body; `null` when the request carried none
    pub body: Option<String>,
    /// Best-effort client address ("unknown" when unavailable)
    pub client_address: String,
    /// Best-effort user agent ("unknown" when unavailable)
    pub client_agent: String,
    /// Capture timestamp
    pub created_at: DateTime<Utc>,
}

impl From<CapturedEvent> for Event {
    fn from(event: CapturedEvent) -> Self {
        Self {
            id: event.id,
            endpoint_id: event.endpoint_id,
            method: event.method,
            headers: event.headers,
            query_params: event.query_params,
            body: event.body,
            client_address: event.client_address,
            client_agent: event.client_agent,
            created_at: event.created_at,
        }
    }
}

/// Captured events for one endpoint, newest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventList {
    /// Events, newest first
    pub events: Vec<Event>,
    /// Number of events in this response
    pub count: usize,
    /// Effective limit applied to the listing
    pub limit: usize,
}

/// Query parameters for event listing
#[derive(Debug, Clone, Deserialize)]
pub struct EventListQuery {
    /// Maximum events to return (default 50, capped at 100)
    pub limit: Option<usize>,
}

/// Endpoint existence/creation information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointMetaResponse {
    /// Endpoint id
    pub endpoint_id: String,
    /// When the endpoint was provisioned
    pub created_at: DateTime<Utc>,
    /// Number of events currently retained
    pub event_count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Number of provisioned endpoints
    pub active_endpoints: usize,
}

/// Generic error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
