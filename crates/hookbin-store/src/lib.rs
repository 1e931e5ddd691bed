//! Core capture store for hookbin
//!
//! Owns the mapping from endpoint id to its bounded, newest-first history of
//! captured HTTP requests. The HTTP layer feeds raw transport fields in
//! through [`RawCapture`] and reads [`CapturedEvent`]s back out; everything
//! in between (normalization, auto-provisioning, the history cap) lives here.

pub mod event;
pub mod id;
pub mod normalize;
pub mod store;

pub use event::{CapturedEvent, EndpointMeta};
pub use id::generate_id;
pub use normalize::{normalize, RawCapture};
pub use store::{HistoryStore, StoreError, DEFAULT_CAPACITY, DEFAULT_LIST_LIMIT};
