//! Neurofeedback event payload.
//!
//! Events arrive from the feed server inside `neurofeedback` frames and from
//! the simulation endpoint. They are immutable once decoded. The wire format
//! is camelCase JSON; the `timestamp` field is normalized to a UTC date on
//! decode regardless of whether the server sent an RFC 3339 string or epoch
//! milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open key/value map carried on every event.
///
/// Unknown keys are preserved so newer servers can add fields without
/// breaking older clients.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A simulated signal of notional brain-region activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeurofeedbackEvent {
    /// Server-assigned event ID.
    pub id: i64,
    /// Owning user, if the event is bound to one.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// When the server produced the event.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// Brain region the signal is attributed to.
    pub brain_region_id: String,
    /// Signal intensity.
    #[serde(default)]
    pub intensity: Option<f64>,
    /// Diagnostic test response that triggered the event.
    #[serde(default)]
    pub test_response_id: Option<i64>,
    /// Signal duration in milliseconds.
    #[serde(default)]
    pub duration: Option<i64>,
    /// Loosely-typed extra fields.
    #[serde(default)]
    pub metadata: Metadata,
}

impl NeurofeedbackEvent {
    /// Create an event stamped with the current time and no optional fields.
    #[must_use]
    pub fn new(id: i64, brain_region_id: impl Into<String>) -> Self {
        Self {
            id,
            user_id: None,
            timestamp: Utc::now(),
            brain_region_id: brain_region_id.into(),
            intensity: None,
            test_response_id: None,
            duration: None,
            metadata: Metadata::new(),
        }
    }
}

mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(String),
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {ms}"))),
            RawTimestamp::Text(text) => parse_text(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {text}"))),
        }
    }

    /// RFC 3339 first; zone-less ISO strings are read as UTC.
    fn parse_text(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}
