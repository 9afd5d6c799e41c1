//! services/client/src/sync/keys.rs
//!
//! Query key builders, kept in one place so every caller constructs the
//! exact same hierarchy and invalidation groups line up.

use eventbook_core::domain::EventFilters;

use super::cache::QueryKey;

/// Canonical textual form of a filter set, so that equal filters always
/// produce equal keys.
fn canonical(filters: &EventFilters) -> String {
    serde_json::to_string(filters).unwrap_or_default()
}

pub mod event_keys {
    use super::*;

    pub fn all() -> QueryKey {
        QueryKey::new(["events"])
    }

    pub fn lists() -> QueryKey {
        all().push("list")
    }

    pub fn list(filters: &EventFilters) -> QueryKey {
        lists().push(canonical(filters))
    }

    pub fn details() -> QueryKey {
        all().push("detail")
    }

    pub fn detail(id: &str) -> QueryKey {
        details().push(id)
    }

    pub fn featured() -> QueryKey {
        all().push("featured")
    }

    pub fn upcoming() -> QueryKey {
        all().push("upcoming")
    }

    pub fn search(query: &str, filters: &EventFilters) -> QueryKey {
        all().push("search").push(query).push(canonical(filters))
    }
}

pub mod registration_keys {
    use super::*;

    pub fn all() -> QueryKey {
        QueryKey::new(["registrations"])
    }

    pub fn lists() -> QueryKey {
        all().push("list")
    }

    pub fn by_user(user_id: &str) -> QueryKey {
        lists().push("user").push(user_id)
    }

    pub fn by_event(event_id: &str) -> QueryKey {
        lists().push("event").push(event_id)
    }

    pub fn status(user_id: &str, event_id: &str) -> QueryKey {
        all().push("status").push(user_id).push(event_id)
    }
}
