//! Marshalling deliveries onto the consumer's thread.
//!
//! The polling thread never calls UI code directly; it hands a job to a
//! [`Dispatcher`]. Without a UI context the job runs inline on the polling
//! thread. A [`ChannelDispatcher`] posts it to a queue that the UI thread
//! drains through [`UiQueue`].

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Runs the job immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Posts jobs to the paired [`UiQueue`].
pub struct ChannelDispatcher {
    tx: Mutex<mpsc::Sender<Job>>,
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, job: Job) {
        let sent = self
            .tx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .send(job);
        if sent.is_err() {
            tracing::warn!("UI queue closed, notification dropped");
        }
    }
}

/// Receiving end, owned by the UI thread.
pub struct UiQueue {
    rx: mpsc::Receiver<Job>,
}

pub fn ui_channel() -> (ChannelDispatcher, UiQueue) {
    let (tx, rx) = mpsc::channel();
    (ChannelDispatcher { tx: Mutex::new(tx) }, UiQueue { rx })
}

impl UiQueue {
    /// Run everything already queued without blocking.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one job and run it.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }

    /// Run jobs as they arrive until `deadline`, or until every dispatcher
    /// has been dropped.
    pub fn run_until(&self, deadline: Instant) -> usize {
        let mut ran = 0;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return ran;
            }
            match self.rx.recv_timeout(left) {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => return ran,
                Err(RecvTimeoutError::Disconnected) => return ran,
            }
        }
    }
}
