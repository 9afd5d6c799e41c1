//! crates/eventbook_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or storage format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a registered account in the event platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    // Plaintext by design: the backing store is a development fixture and
    // the credential check is a simulation. Not for production.
    pub password: String,
    pub avatar: Option<String>,
    /// Event ids this user is registered for. Set semantics: duplicates are
    /// suppressed on every mutation.
    #[serde(default)]
    pub registered_event_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Adds an event id to the registered list, suppressing duplicates.
    /// Returns `true` if the id was not already present.
    pub fn add_registered_event(&mut self, event_id: &str) -> bool {
        if self.registered_event_ids.iter().any(|id| id == event_id) {
            return false;
        }
        self.registered_event_ids.push(event_id.to_string());
        true
    }

    /// Removes an event id from the registered list.
    pub fn remove_registered_event(&mut self, event_id: &str) -> bool {
        let before = self.registered_event_ids.len();
        self.registered_event_ids.retain(|id| id != event_id);
        self.registered_event_ids.len() != before
    }
}

/// A discoverable event with its schedule, pricing and capacity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Wall-clock start, `HH:MM`.
    pub time: String,
    pub location: String,
    pub price: f64,
    pub image: String,
    pub capacity: u32,
    /// Remaining seats. Always within `[0, capacity]`.
    pub available_spots: u32,
    pub speakers: Vec<Speaker>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_sold_out(&self) -> bool {
        self.available_spots == 0
    }
}

/// A person presenting at an event. Nested value object with no
/// independent lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    pub name: String,
    pub title: String,
    pub bio: String,
    pub avatar: Option<String>,
}

/// Lifecycle state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
}

/// A user's attendance record for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub registered_at: DateTime<Utc>,
    pub status: RegistrationStatus,
}

/// The current authentication state of the device.
///
/// `is_authenticated` is always derived from the presence of both parts and
/// is never stored separately, so it cannot diverge from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupCredentials {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// What a successful login or signup hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// A partial update to a user record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub registered_event_ids: Option<Vec<String>>,
}

/// A partial update to an event record, also used as the payload for event
/// creation. `None` fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub capacity: Option<u32>,
    pub available_spots: Option<u32>,
    pub speakers: Option<Vec<Speaker>>,
}

/// One page of a listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filtering and pagination options for event listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub category: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub location: Option<String>,
}

impl EventFilters {
    pub fn paged(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }
}
