//! services/client/src/transformers/event.rs
//!
//! Conversion between the remote store's event records and the canonical
//! `Event` entity.

use chrono::{NaiveDate, NaiveTime};
use eventbook_core::domain::{Event, EventPatch, Speaker};
use serde::{Deserialize, Serialize};

use super::parse_timestamp;

/// Raw event record as the remote store returns it. Numeric fields arrive
/// string-encoded; the single speaker is flattened into the event itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub price: String,
    pub image: String,
    pub capacity: String,
    pub available_spots: String,
    pub speakers_name: String,
    pub speaker_title: String,
    pub speaker_bio: String,
    pub speaker_avatar: String,
    pub created_at: String,
}

impl WireEvent {
    pub fn to_domain(&self) -> Event {
        let capacity = parse_count(&self.capacity);
        Event {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            date: extract_date(&self.date),
            time: extract_time(&self.time),
            location: self.location.clone(),
            price: parse_number(&self.price).max(0.0),
            image: self.image.clone(),
            capacity,
            // Upstream occasionally reports more spots than capacity; clamp
            // down silently on ingestion.
            available_spots: parse_count(&self.available_spots).min(capacity),
            speakers: vec![self.speaker()],
            created_at: parse_timestamp(&self.created_at),
        }
    }

    /// The wire format carries exactly one flattened speaker; the canonical
    /// model expects a sequence, so expand it with a synthesized id.
    fn speaker(&self) -> Speaker {
        Speaker {
            id: format!("{}-speaker", self.id),
            name: self.speakers_name.clone(),
            title: self.speaker_title.clone(),
            bio: if self.speaker_bio.is_empty() {
                "No bio available".to_string()
            } else {
                self.speaker_bio.clone()
            },
            avatar: non_empty(&self.speaker_avatar),
        }
    }
}

/// Partial event record in wire form. Absent fields are omitted entirely,
/// never serialized as null.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_spots: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speakers_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_avatar: Option<String>,
}

impl WireEventPatch {
    pub fn from_domain(patch: &EventPatch) -> Self {
        let speaker = patch.speakers.as_ref().and_then(|s| s.first());
        Self {
            title: patch.title.clone(),
            description: patch.description.clone(),
            date: patch.date.as_deref().map(date_to_iso),
            time: patch.time.as_deref().map(time_to_iso),
            location: patch.location.clone(),
            price: patch.price.map(|p| p.to_string()),
            image: patch.image.clone(),
            capacity: patch.capacity.map(|c| c.to_string()),
            available_spots: patch.available_spots.map(|s| s.to_string()),
            speakers_name: speaker.map(|s| s.name.clone()),
            speaker_title: speaker.map(|s| s.title.clone()),
            speaker_bio: speaker.map(|s| s.bio.clone()),
            speaker_avatar: speaker.map(|s| s.avatar.clone().unwrap_or_default()),
        }
    }
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Parses a string-encoded number, falling back to 0 on non-numeric input.
fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// Parses a string-encoded count: fallback 0, fractional input floored,
/// negatives treated as 0.
fn parse_count(raw: &str) -> u32 {
    let value = parse_number(raw).floor();
    if value.is_sign_negative() || value.is_nan() {
        0
    } else if value > f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

/// Reduces an ISO timestamp to its calendar day. Unparseable input passes
/// through raw.
fn extract_date(raw: &str) -> String {
    parse_timestamp_or_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Reduces an ISO timestamp to `HH:MM`. Unparseable input passes through raw.
fn extract_time(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn parse_timestamp_or_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn date_to_iso(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| format!("{}T00:00:00.000Z", d.format("%Y-%m-%d")))
        .unwrap_or_else(|_| date.to_string())
}

fn time_to_iso(time: &str) -> String {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|t| format!("2000-01-01T{}:00.000Z", t.format("%H:%M")))
        .unwrap_or_else(|_| time.to_string())
}
