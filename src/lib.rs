//! campus-harvest — resilient extraction of structured records from
//! JS-rendered campus directories.
//!
//! The pipeline drives one scripted browser session through UI gates and
//! incremental "load more" pagination, discovers a stub catalog, visits each
//! detail page, and extracts per-record fields through ordered fallback
//! chains. Every failure below catalog level degrades to a sentinel value in
//! the output table instead of aborting the batch.

pub mod core;
pub mod extract;
pub mod output;
pub mod runner;
pub mod session;

pub use crate::core::config::{DatasetKind, HarvestConfig};
pub use crate::core::error::{DriverError, HarvestError};
pub use crate::core::types::{
    LocationRecord, MenuItemRecord, OrgRecord, RecordStub, TableRecord,
};
pub use crate::output::OutputSink;
pub use crate::runner::{run, BatchRunner, DatasetReport, RunSummary};
pub use crate::session::cdp::CdpSession;
pub use crate::session::driver::{Driver, Locator};
pub use crate::session::gates::{GateAction, GateSpec, NavigationController};
pub use crate::session::pagination::{PaginationLoader, PaginationOutcome};
