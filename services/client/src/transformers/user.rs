//! services/client/src/transformers/user.rs
//!
//! Conversion between the remote store's user records and the canonical
//! `User` entity.

use eventbook_core::domain::{User, UserPatch};
use serde::{Deserialize, Serialize};

use super::{dedupe_ids, parse_timestamp};

/// Raw user record as the remote store returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub registered_event_ids: Vec<String>,
    pub created_at: String,
}

impl WireUser {
    pub fn to_domain(&self) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            avatar: self.avatar.clone().filter(|a| !a.is_empty()),
            registered_event_ids: dedupe_ids(&self.registered_event_ids),
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

/// Partial user record in wire form. Absent fields are omitted entirely,
/// never serialized as null.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_event_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl WireUserPatch {
    pub fn from_patch(patch: &UserPatch) -> Self {
        Self {
            name: patch.name.clone(),
            email: patch.email.clone(),
            password: patch.password.clone(),
            avatar: patch.avatar.clone(),
            registered_event_ids: patch.registered_event_ids.as_deref().map(dedupe_ids),
            created_at: None,
        }
    }

    /// Full record for creating a user remotely. The id is left to the
    /// remote store; the local copy keeps its own.
    pub fn from_new_user(user: &User) -> Self {
        Self {
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            password: Some(user.password.clone()),
            avatar: user.avatar.clone(),
            registered_event_ids: Some(user.registered_event_ids.clone()),
            created_at: Some(
                user.created_at
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ),
        }
    }

    /// The mirrored registration write: only the id list changes.
    pub fn registered_events(ids: Vec<String>) -> Self {
        Self {
            registered_event_ids: Some(dedupe_ids(&ids)),
            ..Self::default()
        }
    }
}
