//! Batch orchestration: discovery → pagination → detail visits → sinks.
//!
//! One live driver session is shared by everything and released on every exit
//! path. Failures are isolated per stub: a bad detail visit degrades that
//! record to its error-sentinel form and the batch moves on. Only catalog
//! discovery failures and required-gate timeouts abort a dataset.

use crate::core::config::{DatasetKind, HarvestConfig};
use crate::core::error::HarvestError;
use crate::core::types::{LocationRecord, OrgRecord, RecordStub};
use crate::extract::dining::{self, LocationExtractor, MenuExtractor};
use crate::extract::orgs::{self, OrgExtractor};
use crate::extract::catalog;
use crate::output::OutputSink;
use crate::session::cdp::CdpSession;
use crate::session::driver::Driver;
use crate::session::gates::NavigationController;
use crate::session::pagination::{PaginationLoader, PaginationOutcome};
use crate::session::wait;
use std::path::Path;
use tracing::{error, info, warn};
use url::Url;

/// Per-dataset result for the end-of-run report.
#[derive(Debug)]
pub struct DatasetReport {
    pub dataset: DatasetKind,
    pub stubs: usize,
    pub records: usize,
    /// Rows emitted in degraded (error-sentinel) form.
    pub failed_records: usize,
    /// Menu items for the dining dataset.
    pub nested_records: usize,
    pub pagination: Option<PaginationOutcome>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<DatasetReport>,
    /// Datasets that aborted, with the reason. Non-fatal as long as at least
    /// one dataset completed discovery.
    pub failed_datasets: Vec<(DatasetKind, String)>,
}

pub struct BatchRunner<'d> {
    driver: &'d dyn Driver,
    config: &'d HarvestConfig,
}

impl<'d> BatchRunner<'d> {
    pub fn new(driver: &'d dyn Driver, config: &'d HarvestConfig) -> Self {
        Self { driver, config }
    }

    /// Run every configured dataset in order. Errs only when no dataset
    /// completed catalog discovery — partial runs are reported, not fatal.
    pub async fn run_all(&self) -> Result<RunSummary, HarvestError> {
        let mut reports = Vec::new();
        let mut failures: Vec<(DatasetKind, HarvestError)> = Vec::new();

        for dataset in &self.config.datasets {
            let result = match dataset {
                DatasetKind::Orgs => self.run_orgs().await,
                DatasetKind::Dining => self.run_dining().await,
            };
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(dataset = dataset.as_str(), error = %e, "dataset aborted");
                    failures.push((*dataset, e));
                }
            }
        }

        if reports.is_empty() {
            return Err(match failures.into_iter().next() {
                Some((_, e)) => e,
                None => HarvestError::CatalogDiscovery {
                    dataset: "run".to_string(),
                    reason: "no datasets configured".to_string(),
                },
            });
        }

        Ok(RunSummary {
            reports,
            failed_datasets: failures
                .into_iter()
                .map(|(dataset, e)| (dataset, e.to_string()))
                .collect(),
        })
    }

    async fn run_orgs(&self) -> Result<DatasetReport, HarvestError> {
        let cfg = &self.config.orgs;
        let timing = &self.config.timing;
        let listing_url = cfg.listing_url();

        info!(url = %listing_url, "discovering organization catalog");
        self.driver.navigate(&listing_url).await?;

        let ready = orgs::listing_ready_signal();
        if !wait::wait_for(self.driver, &ready, timing.gate_timeout(), timing.poll_interval())
            .await?
        {
            return Err(HarvestError::CatalogDiscovery {
                dataset: "orgs".to_string(),
                reason: format!("listing signal {ready} never appeared"),
            });
        }

        let loader = PaginationLoader {
            trigger: orgs::load_more_trigger(),
            ready_signal: ready,
            trigger_timeout: timing.trigger_timeout(),
            ready_timeout: timing.ready_timeout(),
            settle: timing.settle(),
            max_rounds: timing.max_load_more_rounds,
            poll: timing.poll_interval(),
        };
        let outcome = loader.load_all(self.driver).await;
        info!(rounds = outcome.rounds(), outcome = ?outcome, "pagination finished");

        let markup = self.driver.page_source().await?;
        if let Some(path) = &cfg.listing_snapshot {
            dump_snapshot(path, &markup);
        }

        let base = parse_base("orgs", &cfg.base_url)?;
        let stubs = catalog::parse_org_listing(&markup, &base);
        if stubs.is_empty() {
            return Err(HarvestError::CatalogDiscovery {
                dataset: "orgs".to_string(),
                reason: "listing parse produced zero stubs".to_string(),
            });
        }
        info!(count = stubs.len(), "organization catalog discovered");

        let extractor = OrgExtractor::new();
        let mut sink = OutputSink::new();
        let mut failed = 0usize;

        for (i, stub) in stubs.iter().enumerate() {
            if i % 10 == 0 {
                info!("processing {}/{}: {}", i + 1, stubs.len(), stub.name);
            }
            let record = match self.visit_org(stub, &extractor).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(org = %stub.name, error = %e, "detail visit failed, emitting error record");
                    failed += 1;
                    // bring the session back somewhere known for the next stub
                    if let Err(nav) = self.driver.navigate(&listing_url).await {
                        warn!(error = %nav, "recovery navigation failed");
                    }
                    OrgRecord::error_for(stub)
                }
            };
            sink.append(record);
        }

        sink.write_to(&cfg.output_path)?;
        info!(path = %cfg.output_path.display(), rows = sink.len(), "organization table written");

        Ok(DatasetReport {
            dataset: DatasetKind::Orgs,
            stubs: stubs.len(),
            records: sink.len(),
            failed_records: failed,
            nested_records: 0,
            pagination: Some(outcome),
        })
    }

    async fn visit_org(
        &self,
        stub: &RecordStub,
        extractor: &OrgExtractor,
    ) -> Result<OrgRecord, HarvestError> {
        let timing = &self.config.timing;
        self.driver.navigate(&stub.detail_link).await?;
        // Absence is fine — the chains degrade to sentinels.
        wait::wait_for(
            self.driver,
            &orgs::detail_ready_signal(),
            timing.detail_timeout(),
            timing.poll_interval(),
        )
        .await?;
        let markup = self.driver.page_source().await?;
        Ok(extractor.extract(stub, &markup))
    }

    async fn run_dining(&self) -> Result<DatasetReport, HarvestError> {
        let cfg = &self.config.dining;
        let timing = &self.config.timing;

        info!(url = %cfg.base_url, "starting dining discovery");
        self.driver.navigate(&cfg.base_url).await?;

        // Required-gate timeouts here happen during catalog discovery and
        // abort the dataset.
        NavigationController::new(self.driver, timing.poll_interval())
            .advance_through(&dining::entry_gates(timing))
            .await?;

        let ready = dining::listing_ready_signal();
        if !wait::wait_for(self.driver, &ready, timing.gate_timeout(), timing.poll_interval())
            .await?
        {
            return Err(HarvestError::CatalogDiscovery {
                dataset: "dining".to_string(),
                reason: format!("location listing signal {ready} never appeared"),
            });
        }

        let markup = self.driver.page_source().await?;
        if let Some(path) = &cfg.listing_snapshot {
            dump_snapshot(path, &markup);
        }

        let base = parse_base("dining", &cfg.base_url)?;
        let stubs = catalog::parse_dining_listing(&markup, &base);
        if stubs.is_empty() {
            return Err(HarvestError::CatalogDiscovery {
                dataset: "dining".to_string(),
                reason: "location listing parse produced zero stubs".to_string(),
            });
        }
        info!(count = stubs.len(), "dining catalog discovered");

        let date = cfg.resolve_menu_date();
        let location_extractor = LocationExtractor::new();
        let menu_extractor = MenuExtractor::new();
        let mut locations: OutputSink<LocationRecord> = OutputSink::new();
        let mut items = OutputSink::new();
        let mut failed = 0usize;

        for (i, stub) in stubs.iter().enumerate() {
            if i % 10 == 0 {
                info!("processing {}/{}: {}", i + 1, stubs.len(), stub.name);
            }

            match self.visit_location(stub, &location_extractor).await {
                Ok(record) => locations.append(record),
                Err(e) => {
                    warn!(location = %stub.name, error = %e, "location visit failed, emitting error record");
                    failed += 1;
                    locations.append(LocationRecord::error_for(stub));
                    continue;
                }
            }

            for meal_type in &cfg.meal_types {
                let menu_url = dining::menu_url(&stub.detail_link, meal_type, &date);
                match self
                    .visit_menu(&menu_url, &stub.name, meal_type, &date, &menu_extractor)
                    .await
                {
                    Ok(menu_items) => {
                        for item in menu_items {
                            items.append(item);
                        }
                    }
                    Err(e) => {
                        warn!(location = %stub.name, meal = %meal_type, error = %e, "menu visit failed, skipping meal");
                    }
                }
            }
        }

        locations.write_to(&cfg.locations_output)?;
        items.write_to(&cfg.menu_output)?;
        info!(
            locations = locations.len(),
            menu_items = items.len(),
            "dining tables written"
        );

        Ok(DatasetReport {
            dataset: DatasetKind::Dining,
            stubs: stubs.len(),
            records: locations.len(),
            failed_records: failed,
            nested_records: items.len(),
            pagination: None,
        })
    }

    async fn visit_location(
        &self,
        stub: &RecordStub,
        extractor: &LocationExtractor,
    ) -> Result<LocationRecord, HarvestError> {
        let timing = &self.config.timing;
        self.driver.navigate(&stub.detail_link).await?;
        wait::wait_for(
            self.driver,
            &dining::location_ready_signal(),
            timing.detail_timeout(),
            timing.poll_interval(),
        )
        .await?;
        let markup = self.driver.page_source().await?;
        Ok(extractor.extract(stub, &markup))
    }

    async fn visit_menu(
        &self,
        url: &str,
        location_name: &str,
        meal_type: &str,
        date: &str,
        extractor: &MenuExtractor,
    ) -> Result<Vec<crate::core::types::MenuItemRecord>, HarvestError> {
        let timing = &self.config.timing;
        self.driver.navigate(url).await?;
        wait::wait_for(
            self.driver,
            &dining::menu_ready_signal(),
            timing.detail_timeout(),
            timing.poll_interval(),
        )
        .await?;
        let markup = self.driver.page_source().await?;
        Ok(extractor.extract_items(location_name, meal_type, date, &markup))
    }
}

/// Launch the browser session, run every configured dataset, and release the
/// session on both the success and the abort path.
pub async fn run(config: &HarvestConfig) -> Result<RunSummary, HarvestError> {
    let session = CdpSession::launch(&config.browser).await?;
    let result = BatchRunner::new(&session, config).run_all().await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "browser close failed");
    }
    result
}

fn parse_base(dataset: &str, url: &str) -> Result<Url, HarvestError> {
    Url::parse(url).map_err(|e| HarvestError::CatalogDiscovery {
        dataset: dataset.to_string(),
        reason: format!("invalid base url {url}: {e}"),
    })
}

fn dump_snapshot(path: &Path, markup: &str) {
    match std::fs::write(path, markup) {
        Ok(()) => info!(path = %path.display(), "listing snapshot written"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write listing snapshot"),
    }
}
