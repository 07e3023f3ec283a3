//! Integration tests for the reminder timer.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use agenda_core::notification::{AlertError, AlertSound};
use agenda_core::reminder::ui_channel;
use agenda_core::{
    Event, EventSource, EventStore, ManualClock, NewEvent, Notification, PollOutcome,
    ReminderConfig, ReminderEngine, ReminderTimer, StaticEvents, Urgency,
};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 2)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn timed(id: &str, date: &str, time: &str) -> Event {
    Event {
        id: id.into(),
        title: format!("Event {id}"),
        date: date.into(),
        time: Some(time.into()),
        description: None,
        created_at: String::new(),
    }
}

fn fast() -> ReminderConfig {
    ReminderConfig {
        poll_interval: Duration::from_millis(20),
        suppressed_poll: Duration::from_millis(20),
        ..ReminderConfig::default()
    }
}

/// Callback that forwards every delivery to a channel.
fn collect(timer: &ReminderTimer) -> mpsc::Receiver<Notification> {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    timer.set_callback(move |n| {
        let _ = tx.lock().unwrap().send(n);
    });
    rx
}

#[test]
fn scenario_a_fires_thirty_seconds_early() {
    let clock = Arc::new(ManualClock::new(at(14, 29, 30)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "14:30")]));
    let timer = ReminderTimer::builder(source, fast()).clock(clock).build();
    let rx = collect(&timer);

    timer.start();
    let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    timer.stop();

    assert_eq!(n.urgency, Urgency::High);
    assert_eq!(n.event.unwrap().id, "a");
}

#[test]
fn scenario_b_does_not_fire_150_seconds_early() {
    let clock = Arc::new(ManualClock::new(at(14, 28, 0)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "14:30")]));
    let timer = ReminderTimer::builder(source, ReminderConfig::default())
        .clock(clock)
        .build();
    assert_eq!(timer.check_now(), PollOutcome::NothingDue { checked: 1 });
}

#[test]
fn scenario_c_tie_delivers_exactly_one_per_cycle() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let source = Arc::new(StaticEvents::new(vec![
        timed("a", "2024-05-02", "14:30"),
        timed("b", "2024-05-02", "14:30"),
    ]));
    let timer = ReminderTimer::builder(source, fast())
        .clock(clock.clone())
        .build();
    let rx = collect(&timer);

    timer.start();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    // Clock is frozen inside the cooldown, so the loop keeps skipping.
    thread::sleep(Duration::from_millis(150));
    assert!(rx.try_recv().is_err());
    assert_eq!(timer.stats().notified_today, 1);

    // Cooldown over but the other event's window has passed.
    clock.set(at(14, 35, 0));
    thread::sleep(Duration::from_millis(150));
    timer.stop();
    assert!(rx.try_recv().is_err());
}

#[test]
fn scenario_d_stop_while_sleeping_then_restart() {
    let clock = Arc::new(ManualClock::new(at(9, 0, 0)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "14:30")]));
    let timer = ReminderTimer::builder(source, ReminderConfig::default())
        .clock(clock.clone())
        .build();
    let rx = collect(&timer);

    timer.start();
    thread::sleep(Duration::from_millis(50));
    assert!(timer.is_running());

    // The loop is in a 60 second sleep; stop must not wait it out.
    let started = Instant::now();
    timer.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!timer.is_running());

    clock.set(at(14, 30, 0));
    timer.start();
    let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(n.event.unwrap().id, "a");
    timer.stop();
}

#[test]
fn cooldown_blocks_second_event_until_resume() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let source = Arc::new(StaticEvents::new(vec![
        timed("a", "2024-05-02", "14:30"),
        timed("b", "2024-05-02", "14:31"),
    ]));
    let timer = ReminderTimer::builder(source, fast())
        .clock(clock.clone())
        .build();
    let rx = collect(&timer);

    timer.start();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    clock.set(at(14, 31, 0));
    thread::sleep(Duration::from_millis(150));
    assert!(rx.try_recv().is_err());
    assert!(timer.stats().suppressed);

    timer.resume();
    let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(n.event.unwrap().id, "b");
    timer.stop();
}

#[test]
fn day_rollover_rearms_event_in_running_loop() {
    let clock = Arc::new(ManualClock::new(at(8, 0, 0)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "08:00")]));
    let timer = ReminderTimer::builder(
        source.clone(),
        ReminderConfig {
            suppression_cooldown: Duration::ZERO,
            ..fast()
        },
    )
    .clock(clock.clone())
    .build();
    let rx = collect(&timer);

    timer.start();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    thread::sleep(Duration::from_millis(100));
    assert!(rx.try_recv().is_err());

    source.replace(vec![timed("a", "2024-05-03", "08:00")]);
    clock.set(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap().and_hms_opt(8, 0, 0).unwrap());
    let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(n.event.unwrap().date, "2024-05-03");
    timer.stop();
}

#[test]
fn delivery_runs_on_ui_thread() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "14:30")]));
    let (dispatcher, ui) = ui_channel();
    let timer = ReminderTimer::builder(source, fast())
        .clock(clock)
        .dispatcher(Arc::new(dispatcher))
        .build();

    let delivered_on = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&delivered_on);
    timer.set_callback(move |_| {
        *slot.lock().unwrap() = Some(thread::current().id());
    });

    timer.start();
    assert!(ui.run_next(Duration::from_secs(5)));
    timer.stop();

    assert_eq!(*delivered_on.lock().unwrap(), Some(thread::current().id()));
}

#[test]
fn stop_from_inside_callback_does_not_deadlock() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "14:30")]));
    let timer = Arc::new(ReminderTimer::builder(source, fast()).clock(clock).build());

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let weak = Arc::downgrade(&timer);
    timer.set_callback(move |_| {
        if let Some(timer) = weak.upgrade() {
            timer.stop();
        }
        let _ = tx.lock().unwrap().send(());
    });

    timer.start();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(!timer.is_running());

    timer.start();
    assert!(timer.is_running());
    timer.stop();
}

#[test]
fn timer_sees_events_added_to_shared_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = EventStore::open(dir.path().join("events.json"))
        .unwrap()
        .into_shared();
    let clock = Arc::new(ManualClock::new(at(10, 0, 0)));
    let timer = ReminderTimer::builder(store.clone(), fast())
        .clock(clock)
        .build();
    let rx = collect(&timer);

    timer.start();
    thread::sleep(Duration::from_millis(60));
    assert!(rx.try_recv().is_err());

    store
        .write()
        .unwrap()
        .add(NewEvent {
            title: "Stand-up".into(),
            date: "2024-05-02".into(),
            time: Some("10:01".into()),
            description: None,
        })
        .unwrap();

    let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(n.event.unwrap().title, "Stand-up");
    assert_eq!(timer.stats().total_events, 1);
    timer.stop();
}

#[test]
fn independent_timers_do_not_share_state() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let events = vec![timed("a", "2024-05-02", "14:30")];
    let first = ReminderTimer::builder(Arc::new(StaticEvents::new(events.clone())), fast())
        .clock(clock.clone())
        .build();
    let second = ReminderTimer::builder(Arc::new(StaticEvents::new(events)), fast())
        .clock(clock)
        .build();

    assert!(first.check_now().fired().is_some());
    assert!(second.check_now().fired().is_some());
    first.clear_today();
    assert_eq!(first.stats().notified_today, 0);
    assert_eq!(second.stats().notified_today, 1);
}

/// Panics on the first read, then serves its events normally.
struct FlakySource {
    failed: AtomicBool,
    events: Vec<Event>,
}

impl EventSource for FlakySource {
    fn events(&self) -> Vec<Event> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            panic!("event file unreadable");
        }
        self.events.clone()
    }
}

#[test]
fn loop_survives_a_panicking_event_source() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let source = Arc::new(FlakySource {
        failed: AtomicBool::new(false),
        events: vec![timed("a", "2024-05-02", "14:30")],
    });
    let timer = ReminderTimer::builder(source.clone(), fast())
        .clock(clock)
        .build();
    let rx = collect(&timer);

    timer.start();
    let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    timer.stop();

    assert!(source.failed.load(Ordering::SeqCst));
    assert_eq!(n.event.unwrap().id, "a");
}

/// An audio device that never returns.
struct StuckAlert(AtomicUsize);

impl AlertSound for StuckAlert {
    fn play(&self, _urgency: Urgency) -> Result<(), AlertError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        loop {
            thread::sleep(Duration::from_secs(3600));
        }
    }
}

#[test]
fn stuck_alert_does_not_block_later_deliveries() {
    let clock = Arc::new(ManualClock::new(at(14, 30, 0)));
    let source = Arc::new(StaticEvents::new(vec![timed("a", "2024-05-02", "14:30")]));
    let alert = Arc::new(StuckAlert(AtomicUsize::new(0)));
    let timer = ReminderTimer::builder(source, fast())
        .clock(clock.clone())
        .alert(alert.clone())
        .build();
    let rx = collect(&timer);

    timer.start();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());

    // Past the 30 second gap, still inside the firing window.
    clock.set(at(14, 30, 30));
    timer.clear_today();
    timer.resume();
    let again = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(again.event.unwrap().id, "a");
    timer.stop();

    let deadline = Instant::now() + Duration::from_secs(5);
    while alert.0.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(alert.0.load(Ordering::SeqCst), 2);
}

proptest! {
    #[test]
    fn at_most_one_fires_per_cycle(offsets in prop::collection::vec(-120i64..=120, 2..8)) {
        let now = at(12, 0, 0);
        let events: Vec<Event> = offsets
            .iter()
            .enumerate()
            .map(|(i, off)| {
                let start = now + chrono::Duration::seconds(*off);
                // Minute precision: stay inside the window after rounding down.
                let start = if *off < 0 { start + chrono::Duration::seconds(59) } else { start };
                timed(&i.to_string(), "2024-05-02", &start.format("%H:%M").to_string())
            })
            .collect();

        let mut engine = ReminderEngine::new(ReminderConfig::default());
        let outcome = engine.tick(now, &events);
        prop_assert!(outcome.fired().is_some());
        prop_assert_eq!(engine.notified_count(), 1);
        let second = engine.tick(now, &events);
        let is_suppressed = matches!(second, PollOutcome::Suppressed { .. });
        prop_assert!(is_suppressed);
    }

    #[test]
    fn window_boundary_is_inclusive(window in 60u64..600) {
        let config = ReminderConfig {
            firing_window: Duration::from_secs(window),
            ..ReminderConfig::default()
        };
        let events = [timed("a", "2024-05-02", "12:00")];
        let start = at(12, 0, 0);

        let mut engine = ReminderEngine::new(config.clone());
        let on_edge = start - chrono::Duration::seconds(window as i64);
        prop_assert!(engine.tick(on_edge, &events).fired().is_some());

        let mut engine = ReminderEngine::new(config);
        let past_edge = on_edge - chrono::Duration::seconds(1);
        prop_assert!(engine.tick(past_edge, &events).fired().is_none());
    }
}
