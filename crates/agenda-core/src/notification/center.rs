//! UI-side notification sink with history.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{play_detached, AlertSound, Notification, NotificationKind};
use crate::event::Event;
use crate::upcoming;

type DisplayFn = Box<dyn Fn(&Notification) + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub total: usize,
    pub by_kind: BTreeMap<NotificationKind, usize>,
}

/// Receives notifications, keeps them, and hands them to a display callback.
#[derive(Default)]
pub struct NotificationCenter {
    history: Mutex<Vec<Notification>>,
    display: Mutex<Option<DisplayFn>>,
    alert: Option<Arc<dyn AlertSound>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play `alert` for every notification shown through this center.
    pub fn with_alert(mut self, alert: Arc<dyn AlertSound>) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn set_display<F>(&self, f: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        *lock(&self.display) = Some(Box::new(f));
    }

    pub fn show(&self, notification: Notification) {
        tracing::info!(
            kind = ?notification.kind,
            urgency = ?notification.urgency,
            title = %notification.title,
            "notification"
        );
        if let Some(ref alert) = self.alert {
            play_detached(Arc::clone(alert), notification.urgency);
        }
        if let Some(ref display) = *lock(&self.display) {
            display(&notification);
        }
        lock(&self.history).push(notification);
    }

    pub fn history(&self) -> Vec<Notification> {
        lock(&self.history).clone()
    }

    pub fn summary(&self) -> NotificationSummary {
        let history = lock(&self.history);
        let mut by_kind = BTreeMap::new();
        for n in history.iter() {
            *by_kind.entry(n.kind).or_insert(0) += 1;
        }
        NotificationSummary {
            total: history.len(),
            by_kind,
        }
    }

    pub fn clear(&self) {
        lock(&self.history).clear();
    }

    /// Show reminders for everything in the next 24 hours.
    pub fn startup_check(&self, events: &[Event], now: NaiveDateTime) -> usize {
        let found = upcoming::scan(events, now, 24);
        let count = found.len();
        if count == 0 {
            tracing::info!("no events in the next 24 hours");
        }
        for n in found {
            self.show(n);
        }
        count
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}
