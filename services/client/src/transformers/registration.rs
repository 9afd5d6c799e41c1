//! services/client/src/transformers/registration.rs
//!
//! Conversion between the remote store's registration records and the
//! canonical `Registration` entity.

use chrono::{SecondsFormat, Utc};
use eventbook_core::domain::{Registration, RegistrationStatus, User};
use serde::{Deserialize, Serialize};

use super::parse_timestamp;

/// Raw registration record as the remote store returns it. Carries
/// denormalized user details the canonical model drops.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireRegistration {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub user_name: String,
    pub user_email: String,
    pub registered_at: String,
    pub status: String,
}

impl WireRegistration {
    pub fn to_domain(&self) -> Registration {
        Registration {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            event_id: self.event_id.clone(),
            registered_at: parse_timestamp(&self.registered_at),
            status: parse_status(&self.status),
        }
    }
}

/// Payload for creating a registration, including the denormalized user
/// details the wire format expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRegistrationCreate {
    pub user_id: String,
    pub event_id: String,
    pub user_name: String,
    pub user_email: String,
    pub registered_at: String,
    pub status: String,
}

impl WireRegistrationCreate {
    pub fn with_user_details(event_id: &str, user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            event_id: event_id.to_string(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            registered_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: "confirmed".to_string(),
        }
    }
}

/// Unknown statuses ingest as confirmed; only an explicit "cancelled" marks
/// a registration dead.
fn parse_status(raw: &str) -> RegistrationStatus {
    if raw.eq_ignore_ascii_case("cancelled") {
        RegistrationStatus::Cancelled
    } else {
        RegistrationStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::wire_registration;
    use chrono::Datelike;

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Test User".to_string(),
            email: "user@test.com".to_string(),
            password: "pw".to_string(),
            avatar: None,
            registered_event_ids: vec![],
            created_at: chrono::DateTime::default(),
        }
    }

    #[test]
    fn status_parses_leniently() {
        let confirmed = wire_registration("r1", "u1", "e1", "confirmed");
        let cancelled = wire_registration("r2", "u1", "e1", "CANCELLED");
        let unknown = wire_registration("r3", "u1", "e1", "gibberish");
        let parse = |v| {
            serde_json::from_value::<WireRegistration>(v)
                .unwrap()
                .to_domain()
                .status
        };
        assert_eq!(parse(confirmed), RegistrationStatus::Confirmed);
        assert_eq!(parse(cancelled), RegistrationStatus::Cancelled);
        assert_eq!(parse(unknown), RegistrationStatus::Confirmed);
    }

    #[test]
    fn registered_at_parses_from_the_wire() {
        let value = wire_registration("r1", "u1", "e1", "confirmed");
        let reg = serde_json::from_value::<WireRegistration>(value)
            .unwrap()
            .to_domain();
        assert_eq!(reg.registered_at.year(), 2026);
    }

    #[test]
    fn create_payload_denormalizes_user_details() {
        let payload = WireRegistrationCreate::with_user_details("e1", &sample_user());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["eventId"], "e1");
        assert_eq!(value["userName"], "Test User");
        assert_eq!(value["userEmail"], "user@test.com");
        assert_eq!(value["status"], "confirmed");
    }
}
