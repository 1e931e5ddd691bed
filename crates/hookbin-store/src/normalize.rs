//! Request normalization
//!
//! Converts raw transport-level fields into a [`CapturedEvent`]. Capture is
//! intentionally permissive: a webhook sender's quirks must never cause a
//! dropped capture, so normalization accepts anything and degrades
//! gracefully instead of failing.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;

use crate::event::CapturedEvent;
use crate::id::generate_id;

/// Sentinel for client metadata the transport could not provide.
pub const UNKNOWN: &str = "unknown";

/// Raw transport fields for one inbound request, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawCapture {
    /// Method token as received. Unknown verbs are accepted unchanged.
    pub method: String,
    /// Header pairs in transport order; duplicate names collapse last-wins.
    pub headers: Vec<(String, String)>,
    /// Raw query string (without the leading `?`), if any.
    pub raw_query: Option<String>,
    /// Raw body bytes. `None` when the request carried no body.
    pub body: Option<Bytes>,
    /// Remote/client address, if the transport knows it.
    pub client_address: Option<String>,
    /// User agent, if the transport knows it.
    pub client_agent: Option<String>,
}

/// Normalize raw transport fields into a stored event.
///
/// Never fails: an absent or empty body stays `None`, non-UTF-8 bodies are
/// stored with lossy conversion rather than rejected, and malformed query
/// fragments are dropped silently.
pub fn normalize(endpoint_id: &str, raw: RawCapture) -> CapturedEvent {
    let mut headers = HashMap::with_capacity(raw.headers.len());
    for (name, value) in raw.headers {
        headers.insert(name, value);
    }

    let query_params = raw
        .raw_query
        .as_deref()
        .map(parse_query)
        .unwrap_or_default();

    // Zero-length bodies count as absent, matching how the transport
    // surfaces "no body" for GET-style requests.
    let body = raw
        .body
        .filter(|b| !b.is_empty())
        .map(|b| String::from_utf8_lossy(&b).into_owned());

    CapturedEvent {
        id: generate_id(),
        endpoint_id: endpoint_id.to_string(),
        method: raw.method,
        headers,
        query_params,
        body,
        client_address: raw
            .client_address
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        client_agent: raw
            .client_agent
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        created_at: Utc::now(),
    }
}

/// Lenient query-string parse: percent-decoded pairs, last value wins per
/// key, empty keys dropped. Never errors on malformed input.
fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        params.insert(key.into_owned(), value.into_owned());
    }
    params
}
