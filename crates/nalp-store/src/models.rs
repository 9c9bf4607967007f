use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Record identifiers
// ---------------------------------------------------------------------------

/// Longest accepted record id.
const MAX_ID_LEN: usize = 64;

/// A history record identifier that is safe to use as a file stem.
///
/// Only ASCII letters, digits, `-` and `_` are accepted, so an id can never
/// name a parent directory or contain a path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh short id: the first 8 hex digits of a random UUID.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..8].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= MAX_ID_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidRecordId(s.to_owned()))
        }
    }
}

/// Error returned when a string is not a valid [`RecordId`].
#[derive(Debug, Clone)]
pub struct InvalidRecordId(pub String);

impl fmt::Display for InvalidRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid record id {:?} (expected 1-{MAX_ID_LEN} characters of [A-Za-z0-9_-])",
            self.0
        )
    }
}

impl std::error::Error for InvalidRecordId {}

// ---------------------------------------------------------------------------
// History record
// ---------------------------------------------------------------------------

/// A persisted snapshot of one generated plan.
///
/// `plan` holds the plan serialized as a JSON string; this crate never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: String,
    pub timestamp: String,
    pub app_idea: String,
    pub budget: String,
    pub skill: String,
    pub plan: String,
}

impl HistoryRecord {
    /// Build a record stamped with a generated id and the current time.
    pub fn new_now(
        app_idea: impl Into<String>,
        budget: impl Into<String>,
        skill: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::generate().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            app_idea: app_idea.into(),
            budget: budget.into(),
            skill: skill.into(),
            plan: plan.into(),
        }
    }

    /// Sort key for the record's timestamp.
    pub fn timestamp_key(&self) -> TimestampKey {
        TimestampKey::parse(&self.timestamp)
    }
}

// ---------------------------------------------------------------------------
// Timestamp ordering
// ---------------------------------------------------------------------------

/// Orderable interpretation of a record timestamp.
///
/// Variant order matters: anything unparseable sorts oldest, then
/// month/day stamps (`"Mar 02"`), then full RFC 3339 instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimestampKey {
    Unparsed,
    MonthDay { month: u32, day: u32 },
    Instant(DateTime<Utc>),
}

impl TimestampKey {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Self::Instant(ts.with_timezone(&Utc));
        }
        // 2000 is a leap year, so "Feb 29" parses.
        if let Ok(date) = NaiveDate::parse_from_str(&format!("2000 {raw}"), "%Y %b %d") {
            return Self::MonthDay {
                month: date.month(),
                day: date.day(),
            };
        }
        Self::Unparsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_accepts_short_tokens() {
        for id in ["a1b2c3d4", "plan_01", "X-y-Z", &"a".repeat(64)] {
            assert!(id.parse::<RecordId>().is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn record_id_rejects_path_like_values() {
        for id in ["", "../etc/passwd", "a/b", "a\\b", "..", "id.json", "sp ace", &"a".repeat(65)] {
            assert!(id.parse::<RecordId>().is_err(), "{id:?} should be rejected");
        }
    }

    #[test]
    fn generated_ids_are_valid_and_distinct() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_eq!(a.as_str().len(), 8);
        assert!(a.as_str().parse::<RecordId>().is_ok());
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_id_message_names_the_value() {
        let err = "../x".parse::<RecordId>().unwrap_err();
        assert!(err.to_string().contains("\"../x\""));
    }

    #[test]
    fn timestamp_key_orders_month_day_chronologically() {
        let jan = TimestampKey::parse("Jan 01");
        let feb = TimestampKey::parse("Feb 15");
        let mar = TimestampKey::parse("Mar 02");
        assert!(jan < feb);
        assert!(feb < mar);
    }

    #[test]
    fn timestamp_key_ranks_instants_above_month_day_and_garbage_last() {
        let instant = TimestampKey::parse("2025-01-01T00:00:00Z");
        let month_day = TimestampKey::parse("Dec 31");
        let garbage = TimestampKey::parse("yesterday-ish");
        assert!(matches!(instant, TimestampKey::Instant(_)));
        assert_eq!(garbage, TimestampKey::Unparsed);
        assert!(instant > month_day);
        assert!(month_day > garbage);
    }

    #[test]
    fn timestamp_key_accepts_leap_day() {
        assert_eq!(
            TimestampKey::parse("Feb 29"),
            TimestampKey::MonthDay { month: 2, day: 29 }
        );
    }

    #[test]
    fn new_now_stamps_rfc3339_and_valid_id() {
        let record = HistoryRecord::new_now("idea", "$50", "Beginner", "{}");
        assert!(record.id.parse::<RecordId>().is_ok());
        assert!(matches!(record.timestamp_key(), TimestampKey::Instant(_)));
    }

    #[test]
    fn record_deserializes_without_id() {
        let json = r#"{"timestamp":"Jan 01","app_idea":"a","budget":"b","skill":"c","plan":"{}"}"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert!(record.id.is_empty());
    }
}
