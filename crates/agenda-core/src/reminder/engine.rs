//! Reminder engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller passes "now" and an event snapshot to
//! `tick()` once per poll.
//!
//! ## Cycle
//!
//! ```text
//! suppressed? -> day rollover -> throttle -> today's timed events
//!             -> first one inside the firing window fires -> cooldown
//! ```
//!
//! At most one reminder fires per cycle.

use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use super::ReminderConfig;
use crate::error::ValidationError;
use crate::event::Event;
use crate::notification::Notification;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Inside a cooldown window; nothing was evaluated.
    Suppressed { remaining_secs: u64 },
    /// Too soon after the last delivery.
    Throttled,
    /// No timed events today.
    NoCandidates,
    /// Candidates were checked and none is due.
    NothingDue { checked: usize },
    Fired(Notification),
}

impl PollOutcome {
    pub fn fired(&self) -> Option<&Notification> {
        match self {
            PollOutcome::Fired(n) => Some(n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderEngine {
    config: ReminderConfig,
    /// Ids already fired on `current_day`.
    notified_today: HashSet<String>,
    current_day: Option<NaiveDate>,
    last_notification: Option<NaiveDateTime>,
    suppressed_until: Option<NaiveDateTime>,
}

impl ReminderEngine {
    pub fn new(config: ReminderConfig) -> Self {
        Self {
            config,
            notified_today: HashSet::new(),
            current_day: None,
            last_notification: None,
            suppressed_until: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    pub fn is_suppressed(&self, now: NaiveDateTime) -> bool {
        self.suppressed_until.is_some_and(|until| now < until)
    }

    pub fn suppressed_remaining_secs(&self, now: NaiveDateTime) -> u64 {
        self.suppressed_until
            .map(|until| (until - now).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    pub fn last_notification(&self) -> Option<NaiveDateTime> {
        self.last_notification
    }

    pub fn notified_count(&self) -> usize {
        self.notified_today.len()
    }

    /// Sorted for stable display.
    pub fn notified_ids(&self) -> Vec<String> {
        self.notified_today
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// One scheduled poll cycle.
    pub fn tick(&mut self, now: NaiveDateTime, events: &[Event]) -> PollOutcome {
        if self.is_suppressed(now) {
            return PollOutcome::Suppressed {
                remaining_secs: self.suppressed_remaining_secs(now),
            };
        }
        self.evaluate(now, events)
    }

    /// Poll cycle without the cooldown check.
    pub fn evaluate(&mut self, now: NaiveDateTime, events: &[Event]) -> PollOutcome {
        let today = now.date();
        if self.current_day != Some(today) {
            if self.current_day.is_some() {
                tracing::info!(%today, "new day, clearing notified events");
            }
            self.notified_today.clear();
            self.current_day = Some(today);
        }

        if let Some(last) = self.last_notification {
            if now - last < span(self.config.min_notification_gap) {
                tracing::debug!("throttled, last notification at {last}");
                return PollOutcome::Throttled;
            }
        }

        let candidates: Vec<&Event> = events
            .iter()
            .filter(|e| e.time.is_some())
            .filter(|e| match e.parse_date() {
                Ok(date) => date == today,
                Err(err) => {
                    tracing::debug!(id = %e.id, error = %err, "skipping event with bad date");
                    false
                }
            })
            .collect();

        if candidates.is_empty() {
            return PollOutcome::NoCandidates;
        }
        tracing::debug!(count = candidates.len(), "checking today's events");

        for event in &candidates {
            match self.is_due(event, now) {
                Ok(true) => {
                    tracing::info!(id = %event.id, title = %event.title, "event starting now");
                    let mut notification = Notification::starting_now(event);
                    notification.created_at = now;
                    self.record_firing(&event.id, now);
                    return PollOutcome::Fired(notification);
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(id = %event.id, error = %err, "skipping event");
                }
            }
        }

        PollOutcome::NothingDue {
            checked: candidates.len(),
        }
    }

    /// Clear the cooldown; the next scheduled cycle evaluates normally.
    pub fn resume(&mut self) {
        self.suppressed_until = None;
    }

    /// Forget today's firings so those events may fire again.
    pub fn clear_today(&mut self) {
        self.notified_today.clear();
    }

    /// Drop both cooldown and throttle, as a manual check does.
    pub fn reset_guards(&mut self) {
        self.suppressed_until = None;
        self.last_notification = None;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_due(&self, event: &Event, now: NaiveDateTime) -> Result<bool, ValidationError> {
        if self.notified_today.contains(&event.id) {
            return Ok(false);
        }
        let Some(start) = event.starts_at()? else {
            return Ok(false);
        };
        let delta = start - now;
        let window = span(self.config.firing_window);
        Ok(delta <= window && delta >= -window)
    }

    fn record_firing(&mut self, id: &str, now: NaiveDateTime) {
        self.notified_today.insert(id.to_string());
        self.last_notification = Some(now);
        let until = now
            .checked_add_signed(span(self.config.suppression_cooldown))
            .unwrap_or(NaiveDateTime::MAX);
        self.suppressed_until = Some(until);
    }
}

fn span(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(365_000))
}
