//! JSON-file event storage.
//!
//! The whole document is rewritten on every save. Mutations that fail to
//! persist are rolled back so memory and disk stay in step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::event::{self, Event, EventPatch, NewEvent, DATE_FORMAT};

const FORMAT_VERSION: &str = "1.0";

/// Read-only, point-in-time view of all events.
///
/// The reminder timer calls this once per poll; implementations must hand
/// back an owned snapshot, never a live reference.
pub trait EventSource: Send + Sync {
    fn events(&self) -> Vec<Event>;
}

/// Event store shared between the owner and a reminder timer.
pub type SharedEventStore = Arc<RwLock<EventStore>>;

impl EventSource for RwLock<EventStore> {
    fn events(&self) -> Vec<Event> {
        match self.read() {
            Ok(store) => store.events().to_vec(),
            Err(poisoned) => poisoned.into_inner().events().to_vec(),
        }
    }
}

/// Fixed in-memory event list, for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticEvents(Mutex<Vec<Event>>);

impl StaticEvents {
    pub fn new(events: Vec<Event>) -> Self {
        Self(Mutex::new(events))
    }

    pub fn replace(&self, events: Vec<Event>) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = events;
    }
}

impl EventSource for StaticEvents {
    fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EventDocument {
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    total_events: usize,
}

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreStats {
    pub total_events: usize,
    pub timed_events: usize,
    pub all_day_events: usize,
    /// Keyed by `YYYY-MM`.
    pub events_per_month: BTreeMap<String, usize>,
    pub data_file: PathBuf,
}

/// File-backed list of calendar events.
#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    events: Vec<Event>,
}

impl EventStore {
    /// Open the store at `path`, creating an empty document if missing.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created or the
    /// existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut store = Self {
            path,
            events: Vec::new(),
        };
        if store.path.exists() {
            store.load()?;
        } else {
            tracing::info!(path = %store.path.display(), "creating new event file");
            store.save()?;
        }
        Ok(store)
    }

    /// Open the store at the configured location.
    ///
    /// # Errors
    /// Returns an error if the config cannot be loaded or the store cannot be opened.
    pub fn open_default() -> Result<Self, crate::error::CoreError> {
        let config = super::Config::load()?;
        Ok(Self::open(config.events_path()?)?)
    }

    pub fn into_shared(self) -> SharedEventStore {
        Arc::new(RwLock::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Reload the event list from disk.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let doc: EventDocument =
            serde_json::from_str(&content).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        self.events = doc.events;
        tracing::debug!(count = self.events.len(), path = %self.path.display(), "loaded events");
        Ok(())
    }

    /// Overwrite the data file with the current list.
    pub fn save(&self) -> Result<(), StoreError> {
        let doc = EventDocument {
            events: self.events.clone(),
            version: FORMAT_VERSION.to_string(),
            updated_at: Some(event::now_timestamp()),
            total_events: self.events.len(),
        };
        let json = serde_json::to_string_pretty(&doc).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(count = self.events.len(), "saved events");
        Ok(())
    }

    /// Validate and append a new event, then persist.
    pub fn add(&mut self, new: NewEvent) -> Result<Event, StoreError> {
        let title = validate_title(&new.title)?;
        event::parse_date(&new.date)?;
        let time = normalize_time(new.time)?;

        let created = Event {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            title,
            date: new.date.trim().to_string(),
            time,
            description: normalize_description(new.description),
            created_at: event::now_timestamp(),
        };

        self.events.push(created.clone());
        if let Err(e) = self.save() {
            self.events.pop();
            return Err(e);
        }
        tracing::info!(id = %created.id, title = %created.title, "event created");
        Ok(created)
    }

    /// Apply a partial edit to an existing event, then persist.
    pub fn update(&mut self, id: &str, patch: EventPatch) -> Result<Event, StoreError> {
        let idx = self.index_of(id)?;
        let mut updated = self.events[idx].clone();

        if let Some(title) = patch.title {
            updated.title = validate_title(&title)?;
        }
        if let Some(date) = patch.date {
            event::parse_date(&date)?;
            updated.date = date.trim().to_string();
        }
        if let Some(time) = patch.time {
            updated.time = normalize_time(time)?;
        }
        if let Some(description) = patch.description {
            updated.description = normalize_description(description);
        }

        let previous = std::mem::replace(&mut self.events[idx], updated.clone());
        if let Err(e) = self.save() {
            self.events[idx] = previous;
            return Err(e);
        }
        Ok(updated)
    }

    /// Remove an event by id, then persist.
    pub fn remove(&mut self, id: &str) -> Result<Event, StoreError> {
        let idx = self.index_of(id)?;
        let removed = self.events.remove(idx);
        if let Err(e) = self.save() {
            self.events.insert(idx, removed);
            return Err(e);
        }
        tracing::info!(id = %removed.id, "event removed");
        Ok(removed)
    }

    pub fn find(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Events on `date`, ordered by time with all-day events first.
    pub fn on_date(&self, date: NaiveDate) -> Vec<&Event> {
        let key = date.format(DATE_FORMAT).to_string();
        let mut found: Vec<&Event> = self.events.iter().filter(|e| e.date == key).collect();
        found.sort_by(|a, b| a.sort_time().cmp(b.sort_time()));
        found
    }

    /// Events in the given month, ordered by date then time.
    ///
    /// Events with an unparseable date are left out.
    pub fn in_month(&self, year: i32, month: u32) -> Vec<&Event> {
        let mut found: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| {
                e.parse_date()
                    .map(|d| d.year() == year && d.month() == month)
                    .unwrap_or(false)
            })
            .collect();
        found.sort_by(|a, b| (&a.date, a.sort_time()).cmp(&(&b.date, b.sort_time())));
        found
    }

    /// Case-insensitive substring search over titles.
    pub fn search_title(&self, term: &str) -> Vec<&Event> {
        let needle = term.to_lowercase();
        self.events
            .iter()
            .filter(|e| e.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn has_events_on(&self, date: NaiveDate) -> bool {
        !self.on_date(date).is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let timed_events = self.events.iter().filter(|e| !e.is_all_day()).count();
        let mut events_per_month = BTreeMap::new();
        for date in self.events.iter().filter_map(|e| e.parse_date().ok()) {
            *events_per_month
                .entry(format!("{}-{:02}", date.year(), date.month()))
                .or_insert(0) += 1;
        }
        StoreStats {
            total_events: self.events.len(),
            timed_events,
            all_day_events: self.events.len() - timed_events,
            events_per_month,
            data_file: self.path.clone(),
        }
    }

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_time(time: Option<String>) -> Result<Option<String>, ValidationError> {
    match time.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(t) => {
            event::parse_time(&t)?;
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
