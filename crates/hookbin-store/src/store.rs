//! Bounded per-endpoint history store
//!
//! Maps endpoint ids to capped, newest-first event histories. The
//! prepend/truncate read-modify-write for one endpoint is serialized through
//! a mutex table keyed by endpoint id: the `DashMap` resolves the key to an
//! `Arc<Mutex<EndpointEntry>>` (releasing the shard lock before the entry
//! mutex is taken), so concurrent writers to the same endpoint cannot lose
//! events while different endpoints proceed fully in parallel.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, trace};

use crate::event::{CapturedEvent, EndpointMeta};
use crate::id::generate_id;
use crate::normalize::{normalize, RawCapture};

/// Maximum events retained per endpoint.
pub const DEFAULT_CAPACITY: usize = 100;

/// Events returned by a list when the caller gives no limit.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Store errors
///
/// The in-memory backend only fails if an entry mutex was poisoned by a
/// panicking writer; durable backends surface connectivity failures through
/// the same variant. Capture inputs themselves can never be an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug)]
struct EndpointEntry {
    created_at: DateTime<Utc>,
    events: VecDeque<CapturedEvent>,
    /// Set by the retention sweep, under this entry's mutex, right before
    /// the entry is unmapped. A writer that resolved the entry before the
    /// sweep sees the flag after locking and re-provisions instead of
    /// appending into an orphan.
    expired: bool,
}

impl EndpointEntry {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            events: VecDeque::new(),
            expired: false,
        }
    }
}

type EntryHandle = Arc<Mutex<EndpointEntry>>;

/// Bounded history store keyed by endpoint id.
///
/// Endpoints are provisioned explicitly via [`create_endpoint`] or
/// implicitly by the first [`record_event`] naming an unknown id. Histories
/// are newest-first and truncated to `capacity` on every write.
///
/// [`create_endpoint`]: HistoryStore::create_endpoint
/// [`record_event`]: HistoryStore::record_event
pub struct HistoryStore {
    endpoints: DashMap<String, EntryHandle>,
    capacity: usize,
}

impl HistoryStore {
    /// Create a store with the default per-endpoint cap of 100 events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store with a custom per-endpoint cap.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            endpoints: DashMap::new(),
            capacity,
        }
    }

    /// Per-endpoint history cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create a new endpoint with an empty history and return its id.
    ///
    /// Always creates; ids are drawn from a space large enough that
    /// collisions are negligible. Should a generated id nonetheless collide,
    /// the existing endpoint's history is kept rather than overwritten.
    pub fn create_endpoint(&self) -> Result<String, StoreError> {
        let id = generate_id();
        self.endpoints
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(EndpointEntry::new())));
        debug!(endpoint_id = %id, "created endpoint");
        Ok(id)
    }

    /// Normalize and append one captured request to an endpoint's history.
    ///
    /// Auto-provisions the endpoint if it does not exist yet: a capture
    /// request is itself sufficient justification to materialize it, which
    /// removes the race between "endpoint created" and "first webhook
    /// already in flight". The new event is prepended and the history
    /// truncated to the cap (oldest dropped). Returns the new event id.
    pub fn record_event(&self, endpoint_id: &str, raw: RawCapture) -> Result<String, StoreError> {
        let mut event = normalize(endpoint_id, raw);
        let event_id = event.id.clone();

        loop {
            let entry = self
                .endpoints
                .entry(endpoint_id.to_string())
                .or_insert_with(|| {
                    debug!(endpoint_id = %endpoint_id, "auto-provisioning endpoint on first capture");
                    Arc::new(Mutex::new(EndpointEntry::new()))
                })
                .clone();
            // Shard lock released; the prepend/truncate below runs under the
            // endpoint's own mutex only.

            let mut guard = entry.lock().map_err(|_| {
                StoreError::Unavailable("endpoint history lock poisoned".to_string())
            })?;

            if guard.expired {
                // Lost a race with the retention sweep: the entry was
                // unmapped after we resolved it. Retry through the map so
                // the capture provisions a fresh endpoint, exactly like a
                // first-ever capture.
                drop(guard);
                continue;
            }

            // Timestamp under the lock so commit order and created_at order
            // agree; writers serialized on this mutex cannot invert the
            // newest-first sequence.
            event.created_at = Utc::now();
            guard.events.push_front(event);
            guard.events.truncate(self.capacity);
            trace!(
                endpoint_id = %endpoint_id,
                event_id = %event_id,
                retained = guard.events.len(),
                "captured event"
            );

            return Ok(event_id);
        }
    }

    /// List up to `limit` events for an endpoint, newest first.
    ///
    /// Defaults to 50 and is hard-capped at the store capacity. An unknown
    /// endpoint yields an empty list, never an error: a client polling
    /// before any webhook has arrived sees a stable empty state, and this
    /// layer deliberately does not distinguish "unknown endpoint" from
    /// "endpoint with no captures yet".
    pub fn list_events(&self, endpoint_id: &str, limit: Option<usize>) -> Vec<CapturedEvent> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(self.capacity);

        let Some(entry) = self.endpoints.get(endpoint_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };

        // A poisoned entry reads as empty; the next poll retries.
        let Ok(guard) = entry.lock() else {
            return Vec::new();
        };
        guard.events.iter().take(limit).cloned().collect()
    }

    /// Creation time and retained-event count for an endpoint, or `None` if
    /// it does not exist. Only used when a caller explicitly needs to expose
    /// endpoint existence.
    pub fn endpoint_meta(&self, endpoint_id: &str) -> Option<EndpointMeta> {
        let entry = self.endpoints.get(endpoint_id).map(|e| e.value().clone())?;
        let guard = entry.lock().ok()?;
        Some(EndpointMeta {
            endpoint_id: endpoint_id.to_string(),
            created_at: guard.created_at,
            event_count: guard.events.len(),
        })
    }

    /// Number of provisioned endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Remove endpoints provisioned longer than `max_age` ago.
    ///
    /// Explicit retention sweep; nothing runs this automatically. A swept
    /// endpoint re-provisions on its next capture exactly like a first-ever
    /// capture. Returns the number of endpoints removed.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let horizon = Utc::now() - max_age;

        let candidates: Vec<String> = self
            .endpoints
            .iter()
            .map(|item| item.key().clone())
            .collect();

        let mut removed = 0;
        for id in candidates {
            let Some(entry) = self.endpoints.get(&id).map(|e| e.value().clone()) else {
                continue;
            };
            let Ok(mut guard) = entry.lock() else {
                continue;
            };
            if guard.expired || guard.created_at >= horizon {
                continue;
            }

            // Tombstone first, then unmap while still holding the entry
            // mutex: a writer that resolved this entry before the removal
            // will observe the flag once it acquires the lock, and retries
            // through the map instead of appending into an orphan. The
            // pointer check keeps a concurrent sweep from unmapping a
            // freshly re-provisioned entry under the same id.
            guard.expired = true;
            if self
                .endpoints
                .remove_if(&id, |_, value| Arc::ptr_eq(value, &entry))
                .is_some()
            {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "retention sweep removed expired endpoints");
        }
        removed
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn capture_with_body(body: &str) -> RawCapture {
        RawCapture {
            method: "POST".to_string(),
            body: Some(Bytes::copy_from_slice(body.as_bytes())),
            ..Default::default()
        }
    }

    fn bare_capture(method: &str) -> RawCapture {
        RawCapture {
            method: method.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_endpoint_empty_history() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();

        assert_eq!(store.endpoint_count(), 1);
        assert!(store.list_events(&id, None).is_empty());

        let meta = store.endpoint_meta(&id).unwrap();
        assert_eq!(meta.endpoint_id, id);
        assert_eq!(meta.event_count, 0);
    }

    #[test]
    fn test_auto_provision_on_first_capture() {
        let store = HistoryStore::new();

        let event_id = store
            .record_event("never-created", bare_capture("POST"))
            .unwrap();

        let events = store.list_events("never-created", None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event_id);
        assert!(store.endpoint_meta("never-created").is_some());
    }

    #[test]
    fn test_unknown_and_empty_endpoints_both_list_empty() {
        let store = HistoryStore::new();
        let created = store.create_endpoint().unwrap();

        assert!(store.list_events("no-such-endpoint", None).is_empty());
        assert!(store.list_events(&created, None).is_empty());
    }

    #[test]
    fn test_newest_first_ordering() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();

        let e1 = store.record_event(&id, bare_capture("GET")).unwrap();
        let e2 = store.record_event(&id, bare_capture("PUT")).unwrap();
        let e3 = store.record_event(&id, bare_capture("DELETE")).unwrap();

        let listed: Vec<String> = store
            .list_events(&id, None)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(listed, vec![e3, e2, e1]);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let store = HistoryStore::with_capacity(5);
        let id = store.create_endpoint().unwrap();

        let mut recorded = Vec::new();
        for i in 0..12 {
            recorded.push(
                store
                    .record_event(&id, capture_with_body(&format!("payload-{i}")))
                    .unwrap(),
            );
        }

        let events = store.list_events(&id, Some(100));
        assert_eq!(events.len(), 5);

        // Exactly the 5 most recent, newest first
        let expected: Vec<&String> = recorded.iter().rev().take(5).collect();
        let listed: Vec<&String> = events.iter().map(|e| &e.id).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn test_limit_respected() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();

        let mut recorded = Vec::new();
        for _ in 0..30 {
            recorded.push(store.record_event(&id, bare_capture("POST")).unwrap());
        }

        let events = store.list_events(&id, Some(10));
        assert_eq!(events.len(), 10);
        let expected: Vec<&String> = recorded.iter().rev().take(10).collect();
        let listed: Vec<&String> = events.iter().map(|e| &e.id).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn test_default_limit_is_50() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();
        for _ in 0..80 {
            store.record_event(&id, bare_capture("POST")).unwrap();
        }
        assert_eq!(store.list_events(&id, None).len(), 50);
    }

    #[test]
    fn test_limit_ceiling_is_capacity() {
        let store = HistoryStore::with_capacity(10);
        let id = store.create_endpoint().unwrap();
        for _ in 0..10 {
            store.record_event(&id, bare_capture("POST")).unwrap();
        }
        // Requests beyond the cap are clamped
        assert_eq!(store.list_events(&id, Some(10_000)).len(), 10);
    }

    #[test]
    fn test_body_round_trip_exact() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();

        store
            .record_event(&id, capture_with_body("{\"test\":\"hello\"}"))
            .unwrap();

        let events = store.list_events(&id, None);
        assert_eq!(events[0].body.as_deref(), Some("{\"test\":\"hello\"}"));
    }

    #[test]
    fn test_missing_body_stays_absent() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();

        store.record_event(&id, bare_capture("GET")).unwrap();
        store.record_event(&id, capture_with_body("")).unwrap();

        let events = store.list_events(&id, None);
        // Both the bodyless capture and the zero-length one list as absent
        assert_eq!(events[0].body, None);
        assert_eq!(events[1].body, None);
    }

    #[test]
    fn test_endpoints_are_independent() {
        let store = HistoryStore::with_capacity(3);
        let a = store.create_endpoint().unwrap();
        let b = store.create_endpoint().unwrap();
        assert_ne!(a, b);

        for _ in 0..5 {
            store.record_event(&a, bare_capture("POST")).unwrap();
        }
        store.record_event(&b, bare_capture("GET")).unwrap();

        assert_eq!(store.list_events(&a, Some(100)).len(), 3);
        assert_eq!(store.list_events(&b, Some(100)).len(), 1);
    }

    #[test]
    fn test_sweep_removes_expired_and_reprovisions() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();
        store.record_event(&id, bare_capture("POST")).unwrap();

        // Horizon in the future relative to creation: everything expires
        let removed = store.sweep_expired(Duration::seconds(-1));
        assert_eq!(removed, 1);
        assert_eq!(store.endpoint_count(), 0);
        assert!(store.list_events(&id, None).is_empty());

        // A later capture for the same id behaves like a first-ever capture
        store.record_event(&id, bare_capture("POST")).unwrap();
        assert_eq!(store.list_events(&id, None).len(), 1);
    }

    #[test]
    fn test_sweep_tombstones_before_unmapping() {
        let store = HistoryStore::new();
        let id = store.create_endpoint().unwrap();

        // Hold the entry handle a concurrent writer would have resolved
        // just before the sweep ran
        let stale = store
            .endpoints
            .get(&id)
            .map(|e| e.value().clone())
            .unwrap();

        assert_eq!(store.sweep_expired(Duration::seconds(-1)), 1);
        assert!(stale.lock().unwrap().expired);

        // The next capture must land in a fresh, reachable entry; the
        // unmapped one stays empty so no acknowledged event can be orphaned
        let event_id = store.record_event(&id, bare_capture("POST")).unwrap();
        let events = store.list_events(&id, None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event_id);
        assert!(stale.lock().unwrap().events.is_empty());
    }

    #[test]
    fn test_sweep_keeps_fresh_endpoints() {
        let store = HistoryStore::new();
        store.create_endpoint().unwrap();
        store.create_endpoint().unwrap();

        let removed = store.sweep_expired(Duration::hours(1));
        assert_eq!(removed, 0);
        assert_eq!(store.endpoint_count(), 2);
    }
}
