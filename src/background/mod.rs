//! Detached background work.
//!
//! Used for side effects whose outcome must not hold up or alter a response,
//! such as populating the result cache, and for periodic housekeeping.

use std::fmt::Display;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Runs `task` on its own Tokio task and forgets about it.
///
/// The result is only observed for logging. Nothing is returned that a caller
/// could wait on.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn detach<F, E>(name: &'static str, task: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match task.await {
            Ok(()) => debug!(task = name, "background task finished"),
            Err(e) => warn!(task = name, error = %e, "background task failed"),
        }
    });
}

/// Runs `task` every `period`, starting one period from now.
///
/// A failed run is logged and the schedule continues. Abort the returned
/// handle to stop.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime or if `period` is zero.
pub fn every<T, F, E>(name: &'static str, period: Duration, mut task: T) -> JoinHandle<()>
where
    T: FnMut() -> F + Send + 'static,
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match task().await {
                Ok(()) => debug!(task = name, "periodic task finished"),
                Err(e) => warn!(task = name, error = %e, "periodic task failed"),
            }
        }
    })
}
