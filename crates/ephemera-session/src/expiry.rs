//! Per-session countdown tasks.
//!
//! Every live session gets its own detached task that sleeps one tick
//! interval, then decrements the lifetime and persists the snapshot,
//! destroying the session when the lifetime reaches zero. A destroyed
//! session is noticed at the next tick boundary: the task checks state
//! before touching the file and exits without persisting.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{trace, warn};

use crate::session::{Session, Tick};

/// Spawn the countdown task for one session.
///
/// The task runs until the session expires or is destroyed, or until the
/// store signals shutdown (or drops the channel), whichever comes first.
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn(session: Session, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    trace!("session ticker stopping for store shutdown");
                    break;
                }
            }

            match session.tick() {
                Ok(Tick::Ticking) => {}
                Ok(Tick::Expired) | Ok(Tick::Stopped) => break,
                Err(err) => {
                    // Keep counting down in memory; the next successful
                    // persist rewrites the whole snapshot anyway.
                    warn!(error = %err, "failed to persist session countdown");
                }
            }
        }
    });
}
