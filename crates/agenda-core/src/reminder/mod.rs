//! Reminder timer.
//!
//! Split into a pure engine and a threaded host:
//!
//! - [`ReminderEngine`]: pure state machine. Given "now" and an event
//!   snapshot it decides whether one reminder fires, and tracks dedup,
//!   throttle and cooldown state. No threads, no I/O.
//! - [`ReminderTimer`]: owns one engine behind a mutex and drives it from a
//!   dedicated background thread, delivering through a [`Dispatcher`].

mod clock;
mod dispatch;
mod engine;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{ui_channel, ChannelDispatcher, Dispatcher, InlineDispatcher, Job, UiQueue};
pub use engine::{PollOutcome, ReminderEngine};
pub use timer::{NotifyFn, ReminderTimer, ReminderTimerBuilder, TimerStats};

use std::time::Duration;

/// Timer cadence and suppression windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    /// Sleep between poll cycles.
    pub poll_interval: Duration,
    /// Minimum spacing between any two deliveries.
    pub min_notification_gap: Duration,
    /// Polling is skipped for this long after a firing.
    pub suppression_cooldown: Duration,
    /// An event fires when `|start - now|` is within this tolerance (inclusive).
    pub firing_window: Duration,
    /// Sleep between cycles while suppressed; capped at `poll_interval`.
    pub suppressed_poll: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            min_notification_gap: Duration::from_secs(30),
            suppression_cooldown: Duration::from_secs(5 * 60),
            firing_window: Duration::from_secs(120),
            suppressed_poll: Duration::from_secs(30),
        }
    }
}

impl ReminderConfig {
    pub(crate) fn suppressed_sleep(&self) -> Duration {
        self.suppressed_poll.min(self.poll_interval)
    }
}
