//! Audible alerts.
//!
//! Playback runs on its own thread so a slow or missing audio device never
//! holds up delivery or the next poll.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use super::Urgency;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("audio output unavailable: {0}")]
    Unavailable(#[from] std::io::Error),
}

pub trait AlertSound: Send + Sync {
    fn play(&self, urgency: Urgency) -> Result<(), AlertError>;
}

/// Rings the terminal bell on stderr; twice for high urgency.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl AlertSound for TerminalBell {
    fn play(&self, urgency: Urgency) -> Result<(), AlertError> {
        let bells = if urgency >= Urgency::High { "\x07\x07" } else { "\x07" };
        let mut err = std::io::stderr().lock();
        err.write_all(bells.as_bytes())?;
        err.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl AlertSound for Silent {
    fn play(&self, _urgency: Urgency) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Fire-and-forget playback. Failures are logged, never returned.
pub fn play_detached(alert: Arc<dyn AlertSound>, urgency: Urgency) {
    let spawned = std::thread::Builder::new()
        .name("agenda-alert".into())
        .spawn(move || {
            match panic::catch_unwind(AssertUnwindSafe(|| alert.play(urgency))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "alert sound failed"),
                Err(_) => tracing::warn!("alert sound panicked"),
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not spawn alert thread");
    }
}
