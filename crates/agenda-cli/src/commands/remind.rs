use std::sync::Arc;
use std::time::{Duration, Instant};

use agenda_core::notification::{AlertSound, TerminalBell};
use agenda_core::reminder::ui_channel;
use agenda_core::validation::validation_stats;
use agenda_core::{
    upcoming, Config, Event, EventSource, EventStore, NotificationCenter, PollOutcome,
    ReminderTimer, SharedEventStore,
};
use chrono::Local;
use clap::Subcommand;

use super::{open_store, print_notification};

#[derive(Subcommand)]
pub enum RemindAction {
    /// Poll for events starting now and print reminders as they fire
    Watch {
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        duration: Option<u64>,
        /// Override reminders.poll_interval_secs
        #[arg(long)]
        interval: Option<u64>,
        /// Skip the 24 hour look-ahead shown on start
        #[arg(long)]
        no_startup_check: bool,
    },
    /// Run a single reminder check now
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List reminders for events in the next hours
    Upcoming {
        #[arg(long, default_value = "24")]
        hours: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a test reminder
    Test,
    /// Summarise past, future and conflicting events
    Validate,
}

/// Re-reads the events file on every poll so edits from other processes
/// are picked up while watching.
struct ReloadingStore(SharedEventStore);

impl EventSource for ReloadingStore {
    fn events(&self) -> Vec<Event> {
        let mut store = self.0.write().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = store.load() {
            tracing::warn!(error = %e, "could not reload events, using last snapshot");
        }
        store.events().to_vec()
    }
}

pub fn run(action: RemindAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RemindAction::Watch {
            duration,
            interval,
            no_startup_check,
        } => watch(duration, interval, no_startup_check),
        RemindAction::Check { json } => {
            let (config, store) = open_store()?;
            let timer = ReminderTimer::new(
                store.into_shared(),
                config.reminders.to_reminder_config(),
            );
            let outcome = timer.check_now();
            if json {
                let report = serde_json::json!({
                    "fired": outcome.fired(),
                    "stats": timer.stats(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            match outcome {
                PollOutcome::Fired(n) => print_notification(&n),
                PollOutcome::NoCandidates => println!("no timed events today"),
                PollOutcome::NothingDue { checked } => {
                    println!("nothing starting now ({checked} checked)")
                }
                PollOutcome::Suppressed { .. } | PollOutcome::Throttled => {
                    println!("nothing starting now")
                }
            }
            Ok(())
        }
        RemindAction::Upcoming { hours, json } => {
            let (_, store) = open_store()?;
            let now = Local::now().naive_local();
            let found = upcoming::scan(store.events(), now, hours);
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if found.is_empty() {
                println!("no events in the next {hours} hours");
            } else {
                for n in &found {
                    print_notification(n);
                }
            }
            Ok(())
        }
        RemindAction::Test => {
            let (config, store) = open_store()?;
            let timer = ReminderTimer::new(
                store.into_shared(),
                config.reminders.to_reminder_config(),
            );
            timer.set_callback(|n| print_notification(&n));
            let sent = timer.send_test_notification();
            if config.notifications.sound {
                if let Err(e) = TerminalBell.play(sent.urgency) {
                    tracing::warn!(error = %e, "alert sound failed");
                }
            }
            Ok(())
        }
        RemindAction::Validate => {
            let (_, store) = open_store()?;
            let today = Local::now().date_naive();
            let stats = validation_stats(store.events(), today);
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn watch(
    duration: Option<u64>,
    interval: Option<u64>,
    no_startup_check: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    if !config.notifications.enabled {
        println!("notifications are disabled (notifications.enabled = false)");
        return Ok(());
    }

    let store = EventStore::open(config.events_path()?)?.into_shared();
    let mut reminder_config = config.reminders.to_reminder_config();
    if let Some(secs) = interval {
        reminder_config.poll_interval = Duration::from_secs(secs.max(1));
    }

    let mut center = NotificationCenter::new();
    if config.notifications.sound {
        center = center.with_alert(Arc::new(TerminalBell));
    }
    center.set_display(print_notification);
    let center = Arc::new(center);

    if !no_startup_check {
        let events = store.events();
        center.startup_check(&events, Local::now().naive_local());
    }

    let (dispatcher, ui) = ui_channel();
    let timer = ReminderTimer::builder(Arc::new(ReloadingStore(store)), reminder_config)
        .dispatcher(Arc::new(dispatcher))
        .build();
    let sink = Arc::clone(&center);
    timer.set_callback(move |n| sink.show(n));
    timer.start();

    match duration {
        Some(secs) => {
            ui.run_until(Instant::now() + Duration::from_secs(secs));
        }
        None => loop {
            ui.run_next(Duration::from_secs(60));
        },
    }

    timer.stop();
    // Deliveries queued after the deadline still belong to this session.
    ui.run_pending();
    let summary = center.summary();
    tracing::info!(total = summary.total, "watch finished");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
