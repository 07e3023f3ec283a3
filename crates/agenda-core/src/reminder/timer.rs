//! Background host for the reminder engine.
//!
//! One polling thread per running timer. All engine state and the callback
//! slot live behind a single mutex; the callback is cloned out and invoked
//! with the lock released, so it may call back into the timer.
//!
//! ## States
//!
//! ```text
//! Stopped -> Running (-> Suppressed -> Running) -> Stopped
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::dispatch::{Dispatcher, InlineDispatcher};
use super::engine::{PollOutcome, ReminderEngine};
use super::ReminderConfig;
use crate::event::{Event, DATE_FORMAT};
use crate::notification::{play_detached, AlertSound, Notification};
use crate::storage::EventSource;

pub type NotifyFn = Arc<dyn Fn(Notification) + Send + Sync>;

const TEST_EVENT_ID: &str = "test_notification";

/// Floor for the pause between cycles.
const MIN_PAUSE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStats {
    pub running: bool,
    pub interval_secs: u64,
    pub notified_today: usize,
    pub notified_ids: Vec<String>,
    pub total_events: usize,
    pub suppressed: bool,
    pub suppressed_remaining_secs: u64,
    pub last_notification: Option<NaiveDateTime>,
}

struct State {
    engine: ReminderEngine,
    callback: Option<NotifyFn>,
    running: bool,
}

struct Shared {
    state: Mutex<State>,
    /// Bumped by every start and stop; a loop runs while it matches.
    generation: Mutex<u64>,
    wake: Condvar,
    source: Arc<dyn EventSource>,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
    alert: Option<Arc<dyn AlertSound>>,
}

/// Polls an [`EventSource`] on a background thread and delivers at most one
/// "starting now" reminder per cycle.
pub struct ReminderTimer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

pub struct ReminderTimerBuilder {
    source: Arc<dyn EventSource>,
    config: ReminderConfig,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn Dispatcher>,
    alert: Option<Arc<dyn AlertSound>>,
}

impl ReminderTimerBuilder {
    /// Deliver through this dispatcher instead of inline on the polling thread.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sound played, detached, after each delivery.
    pub fn alert(mut self, alert: Arc<dyn AlertSound>) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn build(self) -> ReminderTimer {
        ReminderTimer {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    engine: ReminderEngine::new(self.config),
                    callback: None,
                    running: false,
                }),
                generation: Mutex::new(0),
                wake: Condvar::new(),
                source: self.source,
                clock: self.clock,
                dispatcher: self.dispatcher,
                alert: self.alert,
            }),
            worker: Mutex::new(None),
        }
    }
}

impl ReminderTimer {
    /// Timer with the system clock, inline delivery and no sound.
    pub fn new(source: Arc<dyn EventSource>, config: ReminderConfig) -> Self {
        Self::builder(source, config).build()
    }

    pub fn builder(source: Arc<dyn EventSource>, config: ReminderConfig) -> ReminderTimerBuilder {
        ReminderTimerBuilder {
            source,
            config,
            clock: Arc::new(SystemClock),
            dispatcher: Arc::new(InlineDispatcher),
            alert: None,
        }
    }

    /// Register or replace the delivery callback.
    pub fn set_callback<F>(&self, f: F)
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        lock(&self.shared.state).callback = Some(Arc::new(f));
    }

    pub fn clear_callback(&self) {
        lock(&self.shared.state).callback = None;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.state).running
    }

    /// Spawn the polling thread. No-op if already running.
    pub fn start(&self) {
        let mut worker = lock(&self.worker);
        if lock(&self.shared.state).running {
            tracing::debug!("reminder timer already running");
            return;
        }
        if let Some(old) = worker.take() {
            join_unless_current(old);
        }

        let generation = {
            let mut generation = lock(&self.shared.generation);
            *generation += 1;
            *generation
        };
        lock(&self.shared.state).running = true;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("agenda-reminders".into())
            .spawn(move || run_loop(shared, generation));
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                tracing::info!(
                    interval_secs = self.shared.poll_interval().as_secs(),
                    "reminder timer started"
                );
            }
            Err(e) => {
                lock(&self.shared.state).running = false;
                tracing::error!(error = %e, "could not spawn reminder thread");
            }
        }
    }

    /// Signal the loop and wait for the polling thread to exit.
    ///
    /// Called from the polling thread itself (an inline callback), it only
    /// signals; the loop exits once the callback returns.
    pub fn stop(&self) {
        // Same lock order as `start`, so a concurrent start cannot slip a
        // new loop in between the signal and the handle take.
        let handle = {
            let mut worker = lock(&self.worker);
            *lock(&self.shared.generation) += 1;
            self.shared.wake.notify_all();

            let mut state = lock(&self.shared.state);
            if state.running {
                state.running = false;
                tracing::info!("reminder timer stopped");
            }
            worker.take()
        };

        if let Some(handle) = handle {
            join_unless_current(handle);
        }
    }

    /// Run one cycle now, ignoring cooldown and throttle.
    pub fn check_now(&self) -> PollOutcome {
        tracing::info!("manual reminder check");
        let now = self.shared.clock.now();
        let events = self.shared.source.events();
        let (outcome, callback) = {
            let mut state = lock(&self.shared.state);
            state.engine.reset_guards();
            (state.engine.evaluate(now, &events), state.callback.clone())
        };
        if let PollOutcome::Fired(ref n) = outcome {
            self.shared.deliver(n.clone(), callback);
        }
        outcome
    }

    /// Lift the cooldown; the loop resumes on its normal cadence.
    pub fn resume(&self) {
        lock(&self.shared.state).engine.resume();
        tracing::info!("reminder timer resumed");
    }

    pub fn clear_today(&self) {
        lock(&self.shared.state).engine.clear_today();
        tracing::info!("cleared today's notified events");
    }

    /// Deliver a reminder for a synthetic event starting now.
    pub fn send_test_notification(&self) -> Notification {
        let now = self.shared.clock.now();
        let event = Event {
            id: TEST_EVENT_ID.to_string(),
            title: "Test notification".to_string(),
            date: now.format(DATE_FORMAT).to_string(),
            time: Some(format!("{:02}:{:02}", now.hour(), now.minute())),
            description: None,
            created_at: now.format(crate::event::TIMESTAMP_FORMAT).to_string(),
        };
        let mut notification = Notification::starting_now(&event);
        notification.created_at = now;

        let callback = {
            let mut state = lock(&self.shared.state);
            state.engine.reset_guards();
            state.callback.clone()
        };
        self.shared.deliver(notification.clone(), callback);
        notification
    }

    pub fn stats(&self) -> TimerStats {
        let total_events = self.shared.source.events().len();
        let now = self.shared.clock.now();
        let state = lock(&self.shared.state);
        TimerStats {
            running: state.running,
            interval_secs: state.engine.config().poll_interval.as_secs(),
            notified_today: state.engine.notified_count(),
            notified_ids: state.engine.notified_ids(),
            total_events,
            suppressed: state.engine.is_suppressed(now),
            suppressed_remaining_secs: state.engine.suppressed_remaining_secs(now),
            last_notification: state.engine.last_notification(),
        }
    }
}

impl Drop for ReminderTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn poll_interval(&self) -> Duration {
        lock(&self.state).engine.config().poll_interval
    }

    fn is_current(&self, generation: u64) -> bool {
        *lock(&self.generation) == generation
    }

    /// Sleep up to `duration`; returns false once this loop has been stopped.
    fn sleep(&self, generation: u64, duration: Duration) -> bool {
        let guard = lock(&self.generation);
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, duration, |current| *current == generation)
            .unwrap_or_else(|p| p.into_inner());
        *guard == generation
    }

    /// One scheduled cycle. Returns how long to sleep afterwards.
    fn cycle(&self) -> Duration {
        let now = self.clock.now();
        {
            let state = lock(&self.state);
            if state.engine.is_suppressed(now) {
                tracing::debug!(
                    remaining_secs = state.engine.suppressed_remaining_secs(now),
                    "reminders suppressed"
                );
                return state.engine.config().suppressed_sleep();
            }
        }

        let events = self.source.events();
        let (outcome, callback, interval) = {
            let mut state = lock(&self.state);
            let outcome = state.engine.tick(now, &events);
            let interval = match outcome {
                PollOutcome::Suppressed { .. } => state.engine.config().suppressed_sleep(),
                _ => state.engine.config().poll_interval,
            };
            (outcome, state.callback.clone(), interval)
        };

        if let PollOutcome::Fired(notification) = outcome {
            self.deliver(notification, callback);
        }
        interval
    }

    fn deliver(&self, notification: Notification, callback: Option<NotifyFn>) {
        let alert = self.alert.clone();
        self.dispatcher.dispatch(Box::new(move || {
            let urgency = notification.urgency;
            match callback {
                Some(callback) => {
                    let title = notification.title.clone();
                    if panic::catch_unwind(AssertUnwindSafe(|| callback(notification))).is_err() {
                        tracing::warn!(%title, "notification callback panicked");
                    }
                }
                None => tracing::debug!("no notification callback registered"),
            }
            if let Some(alert) = alert {
                play_detached(alert, urgency);
            }
        }));
    }
}

fn run_loop(shared: Arc<Shared>, generation: u64) {
    while shared.is_current(generation) {
        let pause = match panic::catch_unwind(AssertUnwindSafe(|| shared.cycle())) {
            Ok(pause) => pause,
            Err(_) => {
                tracing::error!("reminder cycle panicked, continuing");
                shared.poll_interval()
            }
        };
        if !shared.sleep(generation, pause.max(MIN_PAUSE)) {
            break;
        }
    }
    tracing::debug!("reminder loop exited");
}

fn join_unless_current(handle: JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        return;
    }
    if handle.join().is_err() {
        tracing::error!("reminder thread panicked");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}
