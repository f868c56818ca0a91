//! End-to-end pipeline scenarios over scripted in-memory drivers.
//!
//! No live browser: the mock drivers hold page markup and answer locator
//! queries through the same HTML engine the extractors use, so gate
//! detection, pagination, extraction, and output are exercised exactly as in
//! a real run.

use async_trait::async_trait;
use campus_harvest::core::config::{DatasetKind, HarvestConfig, TimingSettings};
use campus_harvest::core::types::{ERROR_FETCHING, ERROR_VALUE, NO_EMAIL, NO_WEBSITE};
use campus_harvest::session::pagination::PaginationOutcome;
use campus_harvest::{BatchRunner, Driver, DriverError, HarvestError, Locator};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

/// Answer an existence probe against static markup with a real query engine,
/// the way a live page would.
fn exists_in(markup: &str, locator: &Locator) -> bool {
    let doc = Html::parse_document(markup);
    match locator {
        Locator::Css(sel) => Selector::parse(sel)
            .map(|s| doc.select(&s).next().is_some())
            .unwrap_or(false),
        Locator::Text { tag, needle } => Selector::parse(tag.as_str())
            .map(|s| {
                doc.select(&s)
                    .any(|el| el.text().collect::<String>().contains(needle.as_str()))
            })
            .unwrap_or(false),
    }
}

fn fast_timing() -> TimingSettings {
    let mut t = TimingSettings::default();
    t.gate_timeout_ms = 100;
    t.ready_timeout_ms = 50;
    t.trigger_timeout_ms = 50;
    t.detail_timeout_ms = 50;
    t.permission_timeout_ms = 30;
    t.poll_interval_ms = 5;
    t.settle_ms = 0;
    t
}

fn temp_output(test: &str, file: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("campus-harvest-{}-{}", std::process::id(), test))
        .join(file)
}

// ── Organization site ────────────────────────────────────────────────────────

const ORG_BASE: &str = "https://campus.test";

struct OrgSiteState {
    current_url: String,
    clicks: u32,
}

/// Listing grows by one card per Load More click; the trigger disappears
/// after `trigger_rounds` clicks. Detail pages are static markup; URLs in
/// `fail_urls` refuse to navigate.
struct OrgSite {
    trigger_rounds: u32,
    initial_cards: u32,
    detail_pages: HashMap<String, String>,
    fail_urls: HashSet<String>,
    state: Mutex<OrgSiteState>,
}

impl OrgSite {
    fn new(trigger_rounds: u32, initial_cards: u32) -> Self {
        Self {
            trigger_rounds,
            initial_cards,
            detail_pages: HashMap::new(),
            fail_urls: HashSet::new(),
            state: Mutex::new(OrgSiteState {
                current_url: String::new(),
                clicks: 0,
            }),
        }
    }

    fn with_detail(mut self, path: &str, markup: &str) -> Self {
        self.detail_pages
            .insert(format!("{ORG_BASE}{path}"), markup.to_string());
        self
    }

    fn failing(mut self, path: &str) -> Self {
        self.fail_urls.insert(format!("{ORG_BASE}{path}"));
        self
    }

    fn listing_markup(&self, clicks: u32) -> String {
        let mut cards = String::new();
        for i in 0..(self.initial_cards + clicks) {
            cards.push_str(&format!(
                r#"<li><a href="/organization/club-{i}">
                     <div style="font-size: 1.125rem;">Club {i}</div>
                   </a></li>"#
            ));
        }
        let trigger = if clicks < self.trigger_rounds {
            r#"<button><span>Load More</span></button>"#
        } else {
            ""
        };
        format!(r#"<ul class="MuiList-root">{cards}</ul>{trigger}"#)
    }

    fn markup_for(&self, url: &str, clicks: u32) -> String {
        if url == format!("{ORG_BASE}/organizations") {
            return self.listing_markup(clicks);
        }
        self.detail_pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }
}

#[async_trait]
impl Driver for OrgSite {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        if self.fail_urls.contains(url) {
            return Err(DriverError::Navigate {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.state.lock().unwrap().current_url = url.to_string();
        Ok(())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        let (url, clicks) = {
            let state = self.state.lock().unwrap();
            (state.current_url.clone(), state.clicks)
        };
        Ok(exists_in(&self.markup_for(&url, clicks), locator))
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        if matches!(locator, Locator::Text { needle, .. } if needle == "Load More") {
            self.state.lock().unwrap().clicks += 1;
        }
        Ok(())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        let (url, clicks) = {
            let state = self.state.lock().unwrap();
            (state.current_url.clone(), state.clicks)
        };
        Ok(self.markup_for(&url, clicks))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

fn org_config(test: &str) -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.datasets = vec![DatasetKind::Orgs];
    config.timing = fast_timing();
    config.orgs.base_url = ORG_BASE.to_string();
    config.orgs.output_path = temp_output(test, "organization_data.csv");
    config
}

/// Scenario A: two stubs; Club A's detail has a description but no contact
/// block. The record still carries every column, with sentinels.
#[tokio::test]
async fn org_detail_without_contact_block_fills_sentinels() {
    let site = OrgSite::new(0, 2)
        .with_detail(
            "/organization/club-0",
            r#"<div class="bodyText-large userSupplied">Weekly practice and socials.</div>"#,
        )
        .with_detail(
            "/organization/club-1",
            r#"<div class="bodyText-large userSupplied">We build rockets.</div>
               <div><span class="sr-only">Contact Email</span> rockets@campus.test</div>
               <a aria-label="Visit our site" href="https://rockets.example.edu">site</a>"#,
        );
    let config = org_config("scenario-a");

    let summary = BatchRunner::new(&site, &config).run_all().await.unwrap();
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].stubs, 2);

    let csv = std::fs::read_to_string(&config.orgs.output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);

    assert!(lines[1].contains(r#""Club 0""#));
    assert!(lines[1].contains(r#""Weekly practice and socials.""#));
    assert!(lines[1].contains(&format!(r#""{NO_EMAIL}""#)));
    assert!(lines[1].contains(&format!(r#""{NO_WEBSITE}""#)));

    assert!(lines[2].contains(r#""rockets@campus.test""#));
    assert!(lines[2].contains(r#""https://rockets.example.edu""#));
}

/// Scenario B: the trigger survives exactly 3 rounds; the catalog reflects
/// everything rendered after round 3.
#[tokio::test]
async fn pagination_runs_three_rounds_and_catalog_reflects_final_listing() {
    let site = OrgSite::new(3, 1);
    let config = org_config("scenario-b");

    let summary = BatchRunner::new(&site, &config).run_all().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.pagination, Some(PaginationOutcome::Exhausted { rounds: 3 }));
    assert_eq!(report.stubs, 4);

    let csv = std::fs::read_to_string(&config.orgs.output_path).unwrap();
    assert_eq!(csv.lines().count(), 5);
}

/// One bad stub degrades to an error-sentinel row; the batch continues and
/// row order stays the discovery order.
#[tokio::test]
async fn detail_visit_failure_is_isolated_to_its_record() {
    let site = OrgSite::new(0, 3)
        .with_detail(
            "/organization/club-0",
            r#"<div class="bodyText-large userSupplied">First.</div>"#,
        )
        .failing("/organization/club-1")
        .with_detail(
            "/organization/club-2",
            r#"<div class="bodyText-large userSupplied">Third.</div>"#,
        );
    let config = org_config("fault-isolation");

    let summary = BatchRunner::new(&site, &config).run_all().await.unwrap();
    assert_eq!(summary.reports[0].failed_records, 1);
    assert_eq!(summary.reports[0].records, 3);

    let csv = std::fs::read_to_string(&config.orgs.output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert!(lines[1].contains(r#""First.""#));
    assert!(lines[2].contains(&format!(r#""{ERROR_FETCHING}""#)));
    assert!(lines[2].contains(&format!(r#""{ERROR_VALUE}""#)));
    assert!(lines[3].contains(r#""Third.""#));

    // rectangular: same separator count on every line
    let seps = lines[0].matches("\",\"").count();
    assert!(lines.iter().all(|l| l.matches("\",\"").count() == seps));
}

/// Zero stubs is fatal — no partial output is meaningful.
#[tokio::test]
async fn empty_listing_aborts_with_catalog_discovery_failure() {
    let site = OrgSite::new(0, 0);
    let config = org_config("empty-catalog");

    let err = BatchRunner::new(&site, &config).run_all().await.unwrap_err();
    match err {
        HarvestError::CatalogDiscovery { dataset, .. } => assert_eq!(dataset, "orgs"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.orgs.output_path.exists());
}

// ── Dining site ──────────────────────────────────────────────────────────────

const DINING_BASE: &str = "https://dining.test";

/// Landing → (View Menus) → onboarding → (Let's do it) → listing. The
/// location-permission dialog never appears, exercising the optional-gate
/// skip. Location and meal pages are static.
struct DiningSite {
    show_entry_button: bool,
    state: Mutex<DiningSiteState>,
}

struct DiningSiteState {
    current_url: String,
    stage: u8,
}

impl DiningSite {
    fn new(show_entry_button: bool) -> Self {
        Self {
            show_entry_button,
            state: Mutex::new(DiningSiteState {
                current_url: String::new(),
                stage: 0,
            }),
        }
    }

    fn markup_for(&self, url: &str, stage: u8) -> String {
        if url == DINING_BASE {
            return match stage {
                0 if self.show_entry_button => {
                    r#"<button class="primary">View Menus</button>"#.to_string()
                }
                0 => r#"<p>Welcome</p>"#.to_string(),
                1 => r#"<button class="primary button-center">Let's do it</button>"#.to_string(),
                _ => r#"
                    <a href="/menu/market-a">Market A</a>
                    <a href="/menu/market-b">Market B</a>
                    <a href="/about">About</a>"#
                    .to_string(),
            };
        }
        if url == format!("{DINING_BASE}/menu/market-a") {
            return r#"<div class="address">770 W. Dayton St., Madison, WI 53706</div>"#
                .to_string();
        }
        if url == format!("{DINING_BASE}/menu/market-b") {
            return r#"<p>No address published</p>"#.to_string();
        }
        if url == format!("{DINING_BASE}/menu/market-a/breakfast/2026-08-04") {
            return r#"
                <div class="menu-item">
                  <div class="food-name">Scrambled Eggs</div>
                  <span class="food-calories">210 Cal</span>
                  <div class="food-icons"><img alt="vegetarian" src="/i/v.svg"></div>
                </div>
                <div class="menu-item">
                  <div class="food-name">Oatmeal</div>
                  <span class="food-calories">Cal info unavailable</span>
                </div>"#
                .to_string();
        }
        // market-b serves nothing for breakfast
        "<html><body></body></html>".to_string()
    }
}

#[async_trait]
impl Driver for DiningSite {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().current_url = url.to_string();
        Ok(())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        let (url, stage) = {
            let state = self.state.lock().unwrap();
            (state.current_url.clone(), state.stage)
        };
        Ok(exists_in(&self.markup_for(&url, stage), locator))
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        match locator {
            Locator::Text { needle, .. } if needle == "View Menus" => state.stage = 1,
            Locator::Text { needle, .. } if needle == "Let's do it" => state.stage = 2,
            Locator::Css(sel) if sel == "button.primary.button-center" => state.stage = 2,
            _ => {}
        }
        Ok(())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        let (url, stage) = {
            let state = self.state.lock().unwrap();
            (state.current_url.clone(), state.stage)
        };
        Ok(self.markup_for(&url, stage))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

fn dining_config(test: &str) -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.datasets = vec![DatasetKind::Dining];
    config.timing = fast_timing();
    config.dining.base_url = DINING_BASE.to_string();
    config.dining.meal_types = vec!["breakfast".to_string()];
    config.dining.menu_date = Some("2026-08-04".to_string());
    config.dining.locations_output = temp_output(test, "dining_hall_locations.csv");
    config.dining.menu_output = temp_output(test, "menu_items.csv");
    config
}

/// Full dining flow: both required gates pass, the absent permission dialog
/// is skipped, locations and nested menu items land in their tables, and
/// calorie text normalizes per scenario C.
#[tokio::test]
async fn dining_flow_passes_gates_and_extracts_nested_menu_items() {
    let site = DiningSite::new(true);
    let config = dining_config("dining-flow");

    let summary = BatchRunner::new(&site, &config).run_all().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.stubs, 2);
    assert_eq!(report.records, 2);
    assert_eq!(report.nested_records, 2);

    let locations = std::fs::read_to_string(&config.dining.locations_output).unwrap();
    let lines: Vec<&str> = locations.lines().collect();
    assert_eq!(lines[0], r#""Name","Link","Address""#);
    assert!(lines[1].contains(r#""770 W. Dayton St., Madison, WI 53706""#));
    assert!(lines[2].contains(r#""Address not found""#));

    let items = std::fs::read_to_string(&config.dining.menu_output).unwrap();
    let lines: Vec<&str> = items.lines().collect();
    assert_eq!(
        lines[0],
        r#""Location","Meal","Date","Item","Calories","Dietary_Traits""#
    );
    assert!(lines[1].contains(r#""Scrambled Eggs","210","vegetarian""#));
    assert!(lines[2].contains(r#""Oatmeal","N/A","""#));
}

/// A required gate that never appears aborts the dataset with
/// NavigationTimeout during catalog discovery.
#[tokio::test]
async fn missing_required_gate_aborts_dining_run() {
    let site = DiningSite::new(false);
    let config = dining_config("gate-timeout");

    let err = BatchRunner::new(&site, &config).run_all().await.unwrap_err();
    match err {
        HarvestError::NavigationTimeout { gate, .. } => assert_eq!(gate, "view-menus"),
        other => panic!("unexpected error: {other}"),
    }
}
