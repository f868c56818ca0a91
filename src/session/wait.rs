//! Poll-condition-with-timeout primitives.
//!
//! Every blocking point in the pipeline goes through these: "poll condition C
//! with bound T, else treat as not-found". The sole fixed delay elsewhere is
//! the configurable pagination settle pause.

use crate::core::error::DriverError;
use crate::session::driver::{Driver, Locator};
use std::time::Duration;
use tokio::time::Instant;

/// Poll for `locator` until it is present or `timeout` elapses.
///
/// Checks immediately before sleeping, so a zero timeout still performs one
/// probe. `Ok(false)` is "not found in time" — never an error.
pub async fn wait_for(
    driver: &dyn Driver,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<bool, DriverError> {
    let deadline = Instant::now() + timeout;
    loop {
        if driver.exists(locator).await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(poll.min(deadline - Instant::now())).await;
    }
}

/// Poll a set of candidate locators until any one is present.
///
/// Candidates are probed in declared order each round, so when several appear
/// simultaneously the earliest-declared one wins deterministically.
pub async fn wait_for_any<'a>(
    driver: &dyn Driver,
    locators: &'a [Locator],
    timeout: Duration,
    poll: Duration,
) -> Result<Option<&'a Locator>, DriverError> {
    let deadline = Instant::now() + timeout;
    loop {
        for locator in locators {
            if driver.exists(locator).await? {
                return Ok(Some(locator));
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll.min(deadline - Instant::now())).await;
    }
}
