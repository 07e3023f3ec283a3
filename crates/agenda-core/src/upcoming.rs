//! Look-ahead scan for upcoming events.
//!
//! Unlike the reminder timer this produces one notification per upcoming
//! event, graded by how soon it starts. Used at startup and on demand.

use chrono::{Duration, NaiveDateTime};

use crate::event::Event;
use crate::notification::{Notification, NotificationKind, Urgency};

const DESCRIPTION_PREVIEW: usize = 100;

pub fn scan(events: &[Event], now: NaiveDateTime, horizon_hours: i64) -> Vec<Notification> {
    let limit = Duration::try_hours(horizon_hours)
        .and_then(|h| now.checked_add_signed(h))
        .unwrap_or(NaiveDateTime::MAX);
    let mut found = Vec::new();

    for event in events {
        let date = match event.parse_date() {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(id = %event.id, error = %e, "skipping event");
                continue;
            }
        };

        match event.starts_at() {
            Ok(Some(start)) => {
                if start < now || start > limit {
                    continue;
                }
                let remaining = start - now;
                let (title, urgency) = if remaining <= Duration::hours(1) {
                    ("Event very soon", Urgency::High)
                } else if remaining <= Duration::hours(24) {
                    ("Event reminder", Urgency::Medium)
                } else {
                    ("Upcoming event", Urgency::Low)
                };

                let mut message = format!(
                    "'{}' starts in {}\nDate: {}\nTime: {}",
                    event.title,
                    format_remaining(remaining),
                    date.format("%A, %-d %B %Y"),
                    start.format("%H:%M"),
                );
                push_description(&mut message, event);
                found.push(
                    Notification::new(NotificationKind::Reminder, title, message, urgency)
                        .with_event(event.clone()),
                );
            }
            Ok(None) if date == now.date() => {
                let mut message = format!("'{}' is scheduled for today", event.title);
                push_description(&mut message, event);
                found.push(
                    Notification::new(NotificationKind::Reminder, "Event today", message, Urgency::Low)
                        .with_event(event.clone()),
                );
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(id = %event.id, error = %e, "skipping event"),
        }
    }

    found
}

/// Human-readable remaining time, coarsening as the span grows.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    if total < 3600 {
        format!("{} minute(s)", total / 60)
    } else if total < 86_400 {
        format!("{} hour(s) and {} minute(s)", total / 3600, (total % 3600) / 60)
    } else {
        format!("{} day(s) and {} hour(s)", total / 86_400, (total % 86_400) / 3600)
    }
}

fn push_description(message: &mut String, event: &Event) {
    if let Some(ref desc) = event.description {
        let preview: String = desc.chars().take(DESCRIPTION_PREVIEW).collect();
        message.push_str(&format!("\nNote: {preview}"));
        if desc.chars().count() > DESCRIPTION_PREVIEW {
            message.push_str("...");
        }
    }
}
