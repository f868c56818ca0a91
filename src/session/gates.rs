//! Gate-by-gate session navigation.
//!
//! A gate is a UI step (consent dialog, permission prompt, entry button) the
//! session must pass before the target content is queryable. Gates are
//! attempted strictly in order, no backtracking: `Init → Gate₀ → Gate₁ → … →
//! ContentReady`, with `NavigationFailed` reachable from any required gate.

use crate::core::error::HarvestError;
use crate::session::driver::{Driver, Locator};
use crate::session::wait;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// Activate the matched element.
    Click,
    /// Dismiss a dialog via its affirmative control. Same driver operation as
    /// `Click`; kept distinct so gate logs read as what the step means.
    Accept,
}

/// One UI gate: candidate locators tried in declared order, the action to
/// perform on the first match, and whether absence is fatal.
#[derive(Debug, Clone)]
pub struct GateSpec {
    pub name: String,
    pub locators: Vec<Locator>,
    pub action: GateAction,
    pub required: bool,
    pub timeout: Duration,
}

impl GateSpec {
    pub fn optional(
        name: impl Into<String>,
        locators: Vec<Locator>,
        action: GateAction,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            locators,
            action,
            required: false,
            timeout,
        }
    }

    pub fn required(
        name: impl Into<String>,
        locators: Vec<Locator>,
        action: GateAction,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            locators,
            action,
            required: true,
            timeout,
        }
    }
}

pub struct NavigationController<'d> {
    driver: &'d dyn Driver,
    poll: Duration,
}

impl<'d> NavigationController<'d> {
    pub fn new(driver: &'d dyn Driver, poll: Duration) -> Self {
        Self { driver, poll }
    }

    /// Drive the session through `gates` in order.
    ///
    /// Per gate: poll all candidate locators up to the gate's timeout; on the
    /// first match, perform the action. A missing optional gate is skipped; a
    /// missing required gate raises `NavigationTimeout`.
    pub async fn advance_through(&self, gates: &[GateSpec]) -> Result<(), HarvestError> {
        for gate in gates {
            match wait::wait_for_any(self.driver, &gate.locators, gate.timeout, self.poll).await? {
                Some(locator) => {
                    debug!(gate = %gate.name, %locator, action = ?gate.action, "gate matched");
                    match self.driver.click(locator).await {
                        Ok(()) => info!(gate = %gate.name, "gate passed"),
                        Err(e) if !gate.required => {
                            // The control can vanish between poll and click
                            // (self-dismissing dialogs). Optional gate, so the
                            // run continues.
                            warn!(gate = %gate.name, error = %e, "optional gate click failed, skipping");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None if gate.required => {
                    return Err(HarvestError::NavigationTimeout {
                        gate: gate.name.clone(),
                        timeout_ms: gate.timeout.as_millis() as u64,
                    });
                }
                None => {
                    info!(gate = %gate.name, "optional gate not present, skipping");
                }
            }
        }
        Ok(())
    }
}
