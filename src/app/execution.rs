use super::types::Transition;
use super::{Bootstrapper, BootstrapperState};
use crate::error::{BootstrapError, ProcessError, Result};
use crate::initializer::Direction;
use crate::process::Process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Shortest pause between two additional-time requests
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1);

impl Bootstrapper {
    /// Guard, lock, and run one transition
    ///
    /// Returns `Ok(true)` when the plan completed and `Ok(false)` when it failed
    /// or was cancelled. A cancelled plan settles in the target state so the
    /// opposite transition can clean up whatever did run; a failed or abandoned
    /// one settles in Faulted. Guard failures and plan construction failures
    /// are returned as errors and leave the state untouched.
    pub(super) async fn transition(
        &self,
        transition: Transition,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.ensure_state(transition.from)?;

        let _lock = self.transition_lock.try_lock().map_err(|_| {
            BootstrapError::TransitionInProgress {
                requested: transition.direction,
            }
        })?;

        // Another transition may have completed between the check and the lock
        self.ensure_state(transition.from)?;

        if cancel.is_cancelled() {
            warn!("{} was cancelled before it started", transition.direction);
            return Ok(false);
        }

        let plan = match transition.direction {
            Direction::Startup => self.startup_process()?,
            Direction::Shutdown => self.shutdown_process()?,
        };

        let span = info_span!(
            "transition",
            id = %Uuid::new_v4(),
            direction = %transition.direction
        );

        async {
            self.set_state(transition.during);
            let mut pending = PendingTransition::new(self, transition.direction, cancel);
            info!("Running {} plan: {}", transition.direction, plan.shape());

            let outcome = self.execute(plan, &pending.cancel).await;
            pending.settled = true;

            match outcome {
                Ok(()) => {
                    self.set_state(transition.to);
                    info!("{} completed", transition.direction);
                    Ok(true)
                }
                Err(failure) if failure.is_cancellation() => {
                    warn!(
                        "{} was cancelled before all initializers ran",
                        transition.direction
                    );
                    self.set_state(transition.to);
                    Ok(false)
                }
                Err(failure) => {
                    report_failure(transition.direction, &failure);
                    self.set_state(BootstrapperState::Faulted);
                    Ok(false)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Await the plan while periodically asking the host for more time
    async fn execute(
        &self,
        plan: Arc<dyn Process>,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), ProcessError> {
        let additional_time = self.additional_time();
        let interval = (additional_time / 2).max(MIN_REQUEST_INTERVAL);

        self.request_additional_time(additional_time);

        let run = plan.run(cancel);
        tokio::pin!(run);

        loop {
            tokio::select! {
                outcome = &mut run => return outcome,
                _ = tokio::time::sleep(interval) => {
                    debug!("Plan still running after {:?}", interval);
                    self.request_additional_time(additional_time);
                }
            }
        }
    }
}

/// Settles a running transition as Faulted if its future is dropped
///
/// Steps that have not started yet see the cancelled token and are skipped.
struct PendingTransition<'a> {
    bootstrapper: &'a Bootstrapper,
    direction: Direction,
    cancel: CancellationToken,
    settled: bool,
}

impl<'a> PendingTransition<'a> {
    fn new(bootstrapper: &'a Bootstrapper, direction: Direction, cancel: &CancellationToken) -> Self {
        Self {
            bootstrapper,
            direction,
            cancel: cancel.child_token(),
            settled: false,
        }
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.cancel.cancel();
        error!("{} was abandoned before it finished", self.direction);
        self.bootstrapper.set_state(BootstrapperState::Faulted);
    }
}

/// Log every leaf of a failed plan
fn report_failure(direction: Direction, failure: &ProcessError) {
    for leaf in failure.flatten() {
        match leaf {
            ProcessError::Cancelled => warn!("{} step was cancelled", direction),
            ProcessError::Failed { step, source } => {
                error!(unit = %step, "Initializer failed during {}: {}", direction, source)
            }
            other => error!("{} failed: {}", direction, other),
        }
    }
}
