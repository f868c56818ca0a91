//! Exhaustive "load more" pagination.
//!
//! The loader clicks the trigger until it disappears (catalog exhausted) or a
//! hard round ceiling is hit. Stub extraction is NOT done here — after the
//! loop the caller captures the final markup once and parses it as a pure
//! function, independent of how many rounds ran.

use crate::session::driver::{Driver, Locator};
use crate::session::wait;
use std::time::Duration;
use tracing::{debug, warn};

/// How the load-more loop ended. `rounds` counts completed trigger clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationOutcome {
    /// The trigger disappeared — natural termination, catalog exhausted.
    Exhausted { rounds: u32 },
    /// The trigger was still present after `max_rounds` clicks. The partial
    /// catalog is accepted; the condition is surfaced in logs.
    BoundReached { rounds: u32 },
    /// A driver fault mid-loop. Fail-soft: the partial catalog is accepted.
    Faulted { rounds: u32 },
}

impl PaginationOutcome {
    pub fn rounds(&self) -> u32 {
        match *self {
            PaginationOutcome::Exhausted { rounds }
            | PaginationOutcome::BoundReached { rounds }
            | PaginationOutcome::Faulted { rounds } => rounds,
        }
    }
}

pub struct PaginationLoader {
    pub trigger: Locator,
    pub ready_signal: Locator,
    pub trigger_timeout: Duration,
    pub ready_timeout: Duration,
    /// Post-click settle pause. The only unconditional delay in the pipeline.
    pub settle: Duration,
    pub max_rounds: u32,
    pub poll: Duration,
}

impl PaginationLoader {
    /// Click the trigger until it disappears, faulting soft on any driver
    /// error other than "trigger not found".
    pub async fn load_all(&self, driver: &dyn Driver) -> PaginationOutcome {
        let mut rounds: u32 = 0;

        while rounds < self.max_rounds {
            let present = match wait::wait_for(
                driver,
                &self.trigger,
                self.trigger_timeout,
                self.poll,
            )
            .await
            {
                Ok(present) => present,
                Err(e) => {
                    warn!(error = %e, rounds, "pagination aborted while probing trigger");
                    return PaginationOutcome::Faulted { rounds };
                }
            };

            if !present {
                debug!(rounds, "load-more trigger gone, catalog exhausted");
                return PaginationOutcome::Exhausted { rounds };
            }

            if let Err(e) = driver.click(&self.trigger).await {
                warn!(error = %e, rounds, "pagination aborted on trigger click");
                return PaginationOutcome::Faulted { rounds };
            }
            rounds += 1;

            match wait::wait_for(driver, &self.ready_signal, self.ready_timeout, self.poll).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(rounds, signal = %self.ready_signal, "ready signal absent after click")
                }
                Err(e) => {
                    warn!(error = %e, rounds, "pagination aborted awaiting ready signal");
                    return PaginationOutcome::Faulted { rounds };
                }
            }

            if !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }
        }

        warn!(
            rounds,
            "load-more trigger still present at round ceiling, accepting partial catalog"
        );
        PaginationOutcome::BoundReached { rounds }
    }
}
