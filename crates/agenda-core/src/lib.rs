//! # Agenda Core Library
//!
//! Core logic for the Agenda desktop calendar. The CLI binary and any GUI
//! shell are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Event store**: JSON-file backed list of calendar events
//! - **Notifications**: value type, UI-side notification center, alert sounds
//! - **Reminder timer**: background poller that raises "starting now"
//!   reminders with dedup, throttle and cooldown
//! - **Validation / upcoming scan**: conflict checks and look-ahead reminders
//!
//! ## Key Components
//!
//! - [`ReminderTimer`]: threaded host for the reminder state machine
//! - [`ReminderEngine`]: the state machine itself
//! - [`EventStore`]: event persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod event;
pub mod notification;
pub mod reminder;
pub mod storage;
pub mod upcoming;
pub mod validation;

pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use event::{Event, EventPatch, NewEvent};
pub use notification::{Notification, NotificationCenter, NotificationKind, Urgency};
pub use reminder::{
    Clock, Dispatcher, ManualClock, PollOutcome, ReminderConfig, ReminderEngine, ReminderTimer,
    SystemClock, TimerStats,
};
pub use storage::{Config, EventSource, EventStore, SharedEventStore, StaticEvents};
