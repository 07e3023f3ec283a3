use agenda_core::event::{parse_date, parse_time};
use agenda_core::validation::{find_conflicts, is_in_past, validate_date_range};
use agenda_core::{Event, EventPatch, NewEvent, Notification};
use chrono::{Datelike, Local, NaiveDate};
use clap::Subcommand;

use super::{open_store, print_notification};

#[derive(Subcommand)]
pub enum EventAction {
    /// Create an event
    Add {
        /// Event title
        title: String,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Start time (HH:MM); omit for an all-day event
        #[arg(long)]
        time: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Create even if it conflicts with another event or lies in the past
        #[arg(long)]
        force: bool,
    },
    /// List events
    List {
        /// Only events on this date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "month")]
        date: Option<String>,
        /// Only events in this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single event as JSON
    Show {
        /// Event ID
        id: String,
    },
    /// Edit an event
    Edit {
        /// Event ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "all_day")]
        time: Option<String>,
        /// Turn into an all-day event
        #[arg(long)]
        all_day: bool,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
    },
    /// Delete an event
    Remove {
        /// Event ID
        id: String,
    },
    /// Search event titles
    Search {
        /// Case-insensitive substring
        term: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Event counts and data file location
    Stats,
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut store) = open_store()?;

    match action {
        EventAction::Add {
            title,
            date,
            time,
            description,
            force,
        } => {
            let day = parse_date(&date)?;
            let start = time.as_deref().map(parse_time).transpose()?;
            let now = Local::now().naive_local();
            validate_date_range(day, now.date())?;

            if !force {
                let mut warnings = Vec::new();
                if let (Some(t), Some(raw)) = (start, time.as_deref()) {
                    let conflicts = find_conflicts(store.events(), day, t, None);
                    if !conflicts.is_empty() {
                        warnings.push(Notification::conflict(&title, &date, raw, &conflicts));
                    }
                }
                if is_in_past(day, start, now) {
                    warnings.push(Notification::past_event(&title, &date, time.as_deref()));
                }
                if !warnings.is_empty() {
                    for w in &warnings {
                        print_notification(w);
                    }
                    return Err("event not created (use --force to create anyway)".into());
                }
            }

            let created = store.add(NewEvent {
                title,
                date,
                time,
                description,
            })?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        EventAction::List { date, month, json } => {
            let events: Vec<&Event> = match (date, month) {
                (Some(date), _) => store.on_date(parse_date(&date)?),
                (None, Some(month)) => {
                    let (year, month) = parse_month(&month)?;
                    store.in_month(year, month)
                }
                (None, None) => {
                    let mut all: Vec<&Event> = store.events().iter().collect();
                    all.sort_by(|a, b| {
                        (&a.date, a.time.as_deref().unwrap_or("00:00"))
                            .cmp(&(&b.date, b.time.as_deref().unwrap_or("00:00")))
                    });
                    all
                }
            };
            print_events(&events, json)?;
        }
        EventAction::Show { id } => {
            let event = store
                .find(&id)
                .ok_or_else(|| format!("event not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(event)?);
        }
        EventAction::Edit {
            id,
            title,
            date,
            time,
            all_day,
            description,
            clear_description,
        } => {
            let patch = EventPatch {
                title,
                date,
                time: if all_day { Some(None) } else { time.map(Some) },
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
            };
            let updated = store.update(&id, patch)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        EventAction::Remove { id } => {
            let removed = store.remove(&id)?;
            println!("removed: {} ({})", removed.title, removed.id);
        }
        EventAction::Search { term, json } => {
            let found = store.search_title(&term);
            print_events(&found, json)?;
        }
        EventAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
    }
    Ok(())
}

fn print_events(events: &[&Event], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("no events");
        return Ok(());
    }
    for e in events {
        let time = e.time.as_deref().unwrap_or("all day");
        println!("{}  {:<7}  {}  [{}]", e.date, time, e.title, e.id);
    }
    Ok(())
}

fn parse_month(s: &str) -> Result<(i32, u32), Box<dyn std::error::Error>> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| format!("invalid month '{s}', expected YYYY-MM"))?;
    Ok((first.year(), first.month()))
}
