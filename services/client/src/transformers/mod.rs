//! services/client/src/transformers/mod.rs
//!
//! Pure mapping functions between the wire representations the remote store
//! speaks (string-encoded numerics, flattened single speakers) and the
//! canonical in-memory entities. Every ingestion path is total: malformed
//! input degrades to a defined fallback, it never fails.

pub mod event;
pub mod registration;
pub mod user;

pub use event::{WireEvent, WireEventPatch};
pub use registration::{WireRegistration, WireRegistrationCreate};
pub use user::{WireUser, WireUserPatch};

use chrono::{DateTime, Utc};

/// Parses an ISO timestamp, degrading to the Unix epoch on malformed input.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Order-preserving duplicate suppression for id lists.
pub(crate) fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}
