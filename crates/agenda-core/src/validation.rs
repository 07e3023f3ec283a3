//! Event validation: schedule conflicts, past dates, sane date ranges.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::{Event, DATE_FORMAT};

const MAX_DAYS_AHEAD: i64 = 3650;
const MAX_DAYS_BEHIND: i64 = 36_500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_events: usize,
    pub past_events: usize,
    pub future_events: usize,
    pub today_events: usize,
    pub timed_events: usize,
    pub all_day_events: usize,
    pub conflicting_events: usize,
}

/// Timed events on `date` starting at exactly `time`, skipping `exclude_id`.
///
/// Stored events with an unparseable time never conflict.
pub fn find_conflicts<'a>(
    events: &'a [Event],
    date: NaiveDate,
    time: NaiveTime,
    exclude_id: Option<&str>,
) -> Vec<&'a Event> {
    let key = date.format(DATE_FORMAT).to_string();
    events
        .iter()
        .filter(|e| e.date == key)
        .filter(|e| exclude_id != Some(e.id.as_str()))
        .filter(|e| matches!(e.parse_time(), Ok(Some(t)) if t == time))
        .collect()
}

/// Whether the date (and time, when given) lies before `now`.
pub fn is_in_past(date: NaiveDate, time: Option<NaiveTime>, now: NaiveDateTime) -> bool {
    if date < now.date() {
        return true;
    }
    match time {
        Some(t) if date == now.date() => date.and_time(t) < now,
        _ => false,
    }
}

pub fn validate_date_range(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date > today + Duration::days(MAX_DAYS_AHEAD) {
        return Err(ValidationError::TooFarAhead(date));
    }
    if date < today - Duration::days(MAX_DAYS_BEHIND) {
        return Err(ValidationError::TooFarBehind(date));
    }
    Ok(())
}

pub fn validation_stats(events: &[Event], today: NaiveDate) -> ValidationStats {
    let mut stats = ValidationStats {
        total_events: events.len(),
        ..Default::default()
    };

    for event in events {
        if let Ok(date) = event.parse_date() {
            match date.cmp(&today) {
                std::cmp::Ordering::Less => stats.past_events += 1,
                std::cmp::Ordering::Greater => stats.future_events += 1,
                std::cmp::Ordering::Equal => stats.today_events += 1,
            }
        }
        if event.is_all_day() {
            stats.all_day_events += 1;
        } else {
            stats.timed_events += 1;
        }

        if let (Ok(date), Ok(Some(time))) = (event.parse_date(), event.parse_time()) {
            if !find_conflicts(events, date, time, Some(&event.id)).is_empty() {
                stats.conflicting_events += 1;
            }
        }
    }

    stats
}
