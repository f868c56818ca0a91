use thiserror::Error;

/// Failures of the underlying browser-automation layer.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigate { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Eval(String),

    #[error("browser session already closed")]
    Closed,
}

/// Run-level failures. Field- and record-level failures never surface here;
/// they are absorbed into sentinel values (see extract::fallback).
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("required gate \"{gate}\" did not appear within {timeout_ms}ms")]
    NavigationTimeout { gate: String, timeout_ms: u64 },

    #[error("catalog discovery for {dataset} produced no stubs: {reason}")]
    CatalogDiscovery { dataset: String, reason: String },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}
