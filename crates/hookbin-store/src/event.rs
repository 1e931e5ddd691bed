//! Captured event and endpoint metadata records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One normalized inbound HTTP request, as stored in an endpoint's history.
///
/// Immutable after capture. The `body` distinguishes "no body" (`None`) from
/// an empty-string body; the store never re-encodes or pretty-prints it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    /// Unique event id
    pub id: String,
    /// Id of the endpoint this event was captured for
    pub endpoint_id: String,
    /// HTTP method token, uppercased as received; unknown verbs are kept as-is
    pub method: String,
    /// Header name -> value, duplicates collapsed last-wins
    pub headers: HashMap<String, String>,
    /// Query parameter name -> value, last value wins per key
    pub query_params: HashMap<String, String>,
    /// Raw request body, absent when the request carried none
    pub body: Option<String>,
    /// Best-effort client address ("unknown" when unavailable)
    pub client_address: String,
    /// Best-effort user agent ("unknown" when unavailable)
    pub client_agent: String,
    /// Capture timestamp, drives the newest-first ordering
    pub created_at: DateTime<Utc>,
}

/// Endpoint existence/creation info, served only when a caller explicitly
/// asks whether an endpoint exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointMeta {
    /// Endpoint id
    pub endpoint_id: String,
    /// When the endpoint was (auto-)provisioned
    pub created_at: DateTime<Utc>,
    /// Number of events currently retained
    pub event_count: usize,
}
