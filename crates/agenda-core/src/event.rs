//! Calendar event model.
//!
//! Dates and times are kept as the strings the user entered (`YYYY-MM-DD`,
//! `HH:MM`) so a hand-edited data file still loads; parsing happens on
//! access and is fallible per event.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Local time of day, `HH:MM`. `None` marks an all-day event.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "now_timestamp")]
    pub created_at: String,
}

/// Fields supplied when creating an event.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub description: Option<String>,
}

/// Partial update applied by `EventStore::update`.
///
/// `time` and `description` use a nested option: `Some(None)` clears the field.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

impl Event {
    pub fn parse_date(&self) -> Result<NaiveDate, ValidationError> {
        parse_date(&self.date)
    }

    /// `Ok(None)` for all-day events.
    pub fn parse_time(&self) -> Result<Option<NaiveTime>, ValidationError> {
        self.time.as_deref().map(parse_time).transpose()
    }

    /// Local start instant, `Ok(None)` for all-day events.
    pub fn starts_at(&self) -> Result<Option<NaiveDateTime>, ValidationError> {
        let date = self.parse_date()?;
        Ok(self.parse_time()?.map(|t| date.and_time(t)))
    }

    pub fn is_all_day(&self) -> bool {
        self.time.is_none()
    }

    /// Sort key used by date/month listings; all-day events sort as "00:00".
    pub(crate) fn sort_time(&self) -> &str {
        self.time.as_deref().unwrap_or("00:00")
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|_| ValidationError::InvalidTime(s.to_string()))
}

pub(crate) fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, time: Option<&str>) -> Event {
        Event {
            id: "evt_1".into(),
            title: "Standup".into(),
            date: date.into(),
            time: time.map(Into::into),
            description: None,
            created_at: "2024-01-01 09:00:00".into(),
        }
    }

    #[test]
    fn starts_at_combines_date_and_time() {
        let e = event("2024-03-15", Some("14:30"));
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(e.starts_at().unwrap(), Some(expected));
    }

    #[test]
    fn all_day_event_has_no_start() {
        let e = event("2024-03-15", None);
        assert!(e.is_all_day());
        assert_eq!(e.starts_at().unwrap(), None);
    }

    #[test]
    fn malformed_fields_are_rejected() {
        assert_eq!(
            event("15/03/2024", None).parse_date(),
            Err(ValidationError::InvalidDate("15/03/2024".into()))
        );
        assert_eq!(
            event("2024-03-15", Some("25:00")).parse_time(),
            Err(ValidationError::InvalidTime("25:00".into()))
        );
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let json = r#"{"id":"a","title":"t","date":"2024-01-02"}"#;
        let e: Event = serde_json::from_str(json).unwrap();
        assert!(e.time.is_none());
        assert!(e.description.is_none());
        assert!(!e.created_at.is_empty());
    }
}
