//! Notification value type and presentation helpers.

mod alert;
mod center;

pub use alert::{play_detached, AlertError, AlertSound, Silent, TerminalBell};
pub use center::{NotificationCenter, NotificationSummary};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Conflict,
    Info,
    Warning,
    Success,
    Error,
}

/// Drives sound and visual treatment downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Urgency {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl From<Urgency> for u8 {
    fn from(u: Urgency) -> Self {
        u as u8
    }
}

impl TryFrom<u8> for Urgency {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Urgency::Low),
            1 => Ok(Urgency::Medium),
            2 => Ok(Urgency::High),
            other => Err(format!("urgency must be 0, 1 or 2, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub event: Option<Event>,
    pub urgency: Urgency,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        urgency: Urgency,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            event: None,
            urgency,
            created_at: Local::now().naive_local(),
        }
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.event = Some(event);
        self
    }

    /// Reminder for an event that is starting right now.
    pub fn starting_now(event: &Event) -> Self {
        let time = event.time.as_deref().unwrap_or("all day");
        Self::new(
            NotificationKind::Reminder,
            "Event starting now",
            format!("'{}' is starting now\nat {}", event.title, time),
            Urgency::High,
        )
        .with_event(event.clone())
    }

    /// A new event collides with existing ones at the same date and time.
    pub fn conflict(title: &str, date: &str, time: &str, conflicting: &[&Event]) -> Self {
        let mut message =
            format!("'{title}' overlaps other events:\n\nDate: {date}\nTime: {time}\n\nConflicts:\n");
        for (i, e) in conflicting.iter().enumerate() {
            message.push_str(&format!(
                "{}. '{}' at {}\n",
                i + 1,
                e.title,
                e.time.as_deref().unwrap_or("-")
            ));
        }
        message.push_str("\nContinue anyway?");
        Self::new(
            NotificationKind::Conflict,
            "Schedule conflict detected",
            message,
            Urgency::High,
        )
    }

    /// A new event is being scheduled in the past.
    pub fn past_event(title: &str, date: &str, time: Option<&str>) -> Self {
        let mut message = format!("'{title}' is scheduled in the past:\n\nDate: {date}\n");
        if let Some(time) = time {
            message.push_str(&format!("Time: {time}\n"));
        }
        message.push_str("\nCreate it anyway?");
        Self::new(
            NotificationKind::Warning,
            "Event in the past",
            message,
            Urgency::Medium,
        )
    }

    pub fn icon(&self) -> &'static str {
        match self.kind {
            NotificationKind::Reminder => "🔔",
            NotificationKind::Conflict => "⚠️",
            NotificationKind::Info => "ℹ️",
            NotificationKind::Warning => "⚡",
            NotificationKind::Success => "✅",
            NotificationKind::Error => "❌",
        }
    }

    /// Visual style name for the urgency level.
    pub fn style(&self) -> &'static str {
        match self.urgency {
            Urgency::Low => "info",
            Urgency::Medium => "warning",
            Urgency::High => "danger",
        }
    }
}
