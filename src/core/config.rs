use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// HarvestConfig — file-based config loader (campus-harvest.json) with env-var
// fallback for the knobs that vary per machine.
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "CAMPUS_HARVEST_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_HEADED: &str = "CAMPUS_HARVEST_HEADED";

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Orgs,
    Dining,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Orgs => "orgs",
            DatasetKind::Dining => "dining",
        }
    }
}

/// Top-level config loaded from `campus-harvest.json`.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HarvestConfig {
    /// Which datasets this run covers, in order.
    pub datasets: Vec<DatasetKind>,
    pub browser: BrowserSettings,
    pub timing: TimingSettings,
    pub orgs: OrgSettings,
    pub dining: DiningSettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            datasets: vec![DatasetKind::Orgs, DatasetKind::Dining],
            browser: BrowserSettings::default(),
            timing: TimingSettings::default(),
            orgs: OrgSettings::default(),
            dining: DiningSettings::default(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BrowserSettings {
    /// Explicit browser executable. Unset means auto-discovery.
    pub executable: Option<String>,
    pub headless: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            width: 1920,
            height: 1080,
        }
    }
}

impl BrowserSettings {
    /// Executable override: JSON field → `CHROME_EXECUTABLE` env var → `None`
    /// (auto-discovery in `session::cdp`).
    pub fn executable_override(&self) -> Option<String> {
        if let Some(exe) = &self.executable {
            if !exe.trim().is_empty() {
                return Some(exe.clone());
            }
        }
        std::env::var(ENV_CHROME_EXECUTABLE)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Headless unless `CAMPUS_HARVEST_HEADED` is set truthy.
    pub fn resolve_headless(&self) -> bool {
        if let Ok(v) = std::env::var(ENV_HEADED) {
            let v = v.trim().to_ascii_lowercase();
            if matches!(v.as_str(), "1" | "true" | "yes" | "on") {
                return false;
            }
        }
        self.headless
    }
}

/// Every blocking point in the pipeline reads its bound from here; there are
/// no other timing sources.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TimingSettings {
    /// UI gates (consent / permission dialogs).
    pub gate_timeout_ms: u64,
    /// Listing ready-signal after a pagination click.
    pub ready_timeout_ms: u64,
    /// "Load more" trigger detection per round.
    pub trigger_timeout_ms: u64,
    /// Detail-page content before extraction.
    pub detail_timeout_ms: u64,
    /// In-page permission dialogs (shorter — they either pop or they don't).
    pub permission_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Post-click settle pause, the one sanctioned fixed delay.
    pub settle_ms: u64,
    /// Hard ceiling on pagination rounds, in case the trigger element is
    /// recreated indefinitely.
    pub max_load_more_rounds: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            gate_timeout_ms: 10_000,
            ready_timeout_ms: 3_000,
            trigger_timeout_ms: 3_000,
            detail_timeout_ms: 5_000,
            permission_timeout_ms: 5_000,
            poll_interval_ms: 250,
            settle_ms: 200,
            max_load_more_rounds: 500,
        }
    }
}

impl TimingSettings {
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_millis(self.trigger_timeout_ms)
    }
    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }
    pub fn permission_timeout(&self) -> Duration {
        Duration::from_millis(self.permission_timeout_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct OrgSettings {
    pub base_url: String,
    pub listing_path: String,
    pub output_path: PathBuf,
    /// When set, the final listing markup is dumped here for replay.
    pub listing_snapshot: Option<PathBuf>,
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            base_url: "https://win.wisc.edu".to_string(),
            listing_path: "/organizations".to_string(),
            output_path: PathBuf::from("organization_data.csv"),
            listing_snapshot: None,
        }
    }
}

impl OrgSettings {
    pub fn listing_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path
        )
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DiningSettings {
    pub base_url: String,
    pub locations_output: PathBuf,
    pub menu_output: PathBuf,
    /// Meal menus fetched per location, in this order.
    pub meal_types: Vec<String>,
    /// `YYYY-MM-DD`; unset means today.
    pub menu_date: Option<String>,
    pub listing_snapshot: Option<PathBuf>,
}

impl Default for DiningSettings {
    fn default() -> Self {
        Self {
            base_url: "https://wisc-housingdining.nutrislice.com".to_string(),
            locations_output: PathBuf::from("dining_hall_locations.csv"),
            menu_output: PathBuf::from("menu_items.csv"),
            meal_types: vec![
                "breakfast".to_string(),
                "lunch".to_string(),
                "dinner".to_string(),
            ],
            menu_date: None,
            listing_snapshot: None,
        }
    }
}

impl DiningSettings {
    pub fn resolve_menu_date(&self) -> String {
        if let Some(d) = &self.menu_date {
            if !d.trim().is_empty() {
                return d.clone();
            }
        }
        chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
    }
}

impl HarvestConfig {
    /// Load `campus-harvest.json` from standard locations.
    ///
    /// Search order (first found wins):
    /// 1. `CAMPUS_HARVEST_CONFIG` env var path
    /// 2. `./campus-harvest.json`
    /// 3. `../campus-harvest.json`
    ///
    /// Missing file → defaults (silent). Parse error → warn, defaults.
    pub fn load() -> Self {
        let candidates: Vec<PathBuf> = {
            let mut v = vec![
                PathBuf::from("campus-harvest.json"),
                PathBuf::from("../campus-harvest.json"),
            ];
            if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
                v.insert(0, PathBuf::from(env_path));
            }
            v
        };

        for path in &candidates {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<HarvestConfig>(&contents) {
                    Ok(cfg) => {
                        tracing::info!("campus-harvest.json loaded from {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "campus-harvest.json parse error at {}: {} — using defaults",
                            path.display(),
                            e
                        );
                        return HarvestConfig::default();
                    }
                },
                Err(_) => continue,
            }
        }

        HarvestConfig::default()
    }
}
