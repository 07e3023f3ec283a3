pub mod config;
pub mod event;
pub mod remind;

use agenda_core::{Config, EventStore, Notification};

/// Open the event store named by the current config.
pub fn open_store() -> Result<(Config, EventStore), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = EventStore::open(config.events_path()?)?;
    Ok((config, store))
}

/// Human-readable rendering used by every command that shows a notification.
pub fn print_notification(n: &Notification) {
    println!("{} {} [{}]", n.icon(), n.title, n.style());
    for line in n.message.lines() {
        println!("   {line}");
    }
}
