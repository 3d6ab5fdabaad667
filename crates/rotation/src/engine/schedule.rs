//! Periodic rotation

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{EngineInner, EngineState, RotationEngine};
use crate::error::{RotationError, RotationResult};
use crate::notify::RotationTrigger;

/// Handle to a running rotation loop
pub(crate) struct Schedule {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl Schedule {
    pub(crate) fn stop(self) {
        self.shutdown.cancel();
    }

    fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.handle.is_finished()
    }
}

impl RotationEngine {
    /// Rotate every `rotation_interval` until stopped
    ///
    /// The first rotation happens one full interval after starting. A failed
    /// scheduled rotation is notified and the schedule carries on. Starting
    /// an already running schedule is a no-op.
    ///
    /// # Errors
    ///
    /// * `RotationError::Configuration` if the policy's interval is zero or
    ///   no Tokio runtime is available
    /// * `RotationError::NotInitialized` before `initialize` completes
    pub fn start_periodic(&self) -> RotationResult<()> {
        let interval = self.inner.policy.validate_periodic()?;
        if self.state() == EngineState::Uninitialized {
            return Err(RotationError::NotInitialized);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            RotationError::configuration("periodic rotation requires a Tokio runtime")
        })?;

        let mut schedule = self.inner.schedule.lock();
        if schedule.as_ref().is_some_and(Schedule::is_running) {
            return Ok(());
        }

        let shutdown = CancellationToken::new();
        let handle = runtime.spawn(run_rotation_loop(
            Arc::downgrade(&self.inner),
            interval,
            shutdown.clone(),
        ));
        *schedule = Some(Schedule { shutdown, handle });

        tracing::info!(interval = ?interval, "Periodic rotation started");
        Ok(())
    }

    /// Stop periodic rotation
    ///
    /// A rotation already in flight runs to completion. Stopping when nothing
    /// is scheduled does nothing.
    pub fn stop_periodic(&self) {
        if let Some(schedule) = self.inner.schedule.lock().take() {
            schedule.stop();
            tracing::info!("Periodic rotation stop requested");
        }
    }

    /// Whether a rotation loop is currently scheduled
    pub fn is_periodic_running(&self) -> bool {
        self.inner
            .schedule
            .lock()
            .as_ref()
            .is_some_and(Schedule::is_running)
    }
}

/// Holds only a weak reference between ticks so dropping the last engine
/// handle ends the loop.
async fn run_rotation_loop(
    weak: Weak<EngineInner>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(inner) = weak.upgrade() else {
                    tracing::debug!("Rotation engine dropped, ending periodic rotation");
                    return;
                };
                let engine = RotationEngine { inner };

                match engine.rotate_with(RotationTrigger::Scheduled).await {
                    Ok(secret) => {
                        tracing::info!(
                            secret_id = %secret.id,
                            "Periodic rotation completed successfully"
                        );
                    }
                    Err(error) => {
                        // Already notified; retry at the next interval
                        tracing::error!(
                            %error,
                            "Periodic rotation failed"
                        );
                    }
                }
                engine.cleanup();
            }
            () = shutdown.cancelled() => {
                tracing::info!("Rotation loop shutting down gracefully");
                return;
            }
        }
    }
}
