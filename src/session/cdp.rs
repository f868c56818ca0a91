//! Native browser session over `chromiumoxide`.
//!
//! This module is the single place that knows CDP:
//! * Finding a usable Chromium-family executable (env override → PATH scan →
//!   well-known install paths).
//! * Launching one headless browser with hardened flags and holding exactly
//!   one page for the whole run.
//! * Implementing the [`Driver`] surface over that page.
//!
//! The session is a scoped resource: `close()` is called on every exit path
//! of a batch run, and `Drop` is a best-effort backstop against zombie
//! browser processes.

use crate::core::config::BrowserSettings;
use crate::core::error::DriverError;
use crate::session::driver::{Driver, Locator};
use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

fn pick_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Find a usable Chromium-family browser executable.
///
/// Resolution order: explicit override → PATH scan → OS well-known paths.
pub fn find_browser_executable(override_path: Option<String>) -> Option<String> {
    if let Some(p) = override_path {
        if Path::new(&p).exists() {
            return Some(p);
        }
        warn!(path = %p, "configured browser executable does not exist, falling back to discovery");
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    let known = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
    ];
    #[cfg(target_os = "linux")]
    let known = [
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
    ];
    #[cfg(target_os = "windows")]
    let known = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    known
        .iter()
        .find(|c| Path::new(c).exists())
        .map(|c| c.to_string())
}

/// Build the launch config.
///
/// Flags: CI-safe operation (`--no-sandbox`, `--disable-dev-shm-usage`) plus
/// the knobs the scripted session needs — `--use-fake-ui-for-media-stream`
/// auto-answers the browser-native location/media prompt so the in-page
/// permission dialog is the only gate left to pass.
fn build_launch_config(exe: &str, settings: &BrowserSettings) -> Result<BrowserConfig, DriverError> {
    let ua = pick_user_agent();

    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: settings.width,
            height: settings.height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(settings.width, settings.height)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-infobars")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--use-fake-ui-for-media-stream")
        .arg(format!("--user-agent={ua}"));

    if !settings.resolve_headless() {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| DriverError::Launch(format!("browser config: {e}")))
}

/// One live browsing context shared by all phases of a run.
pub struct CdpSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
}

impl CdpSession {
    /// Launch the browser and open the single page the session will use.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, DriverError> {
        let exe = find_browser_executable(settings.executable_override()).ok_or_else(|| {
            DriverError::Launch(
                "no browser found — install Chrome or Chromium, or set CHROME_EXECUTABLE"
                    .to_string(),
            )
        })?;

        info!(browser = %exe, "launching browser session");
        let config = build_launch_config(&exe, settings)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(format!("{exe}: {e}")))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let mut browser = browser;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(format!("failed to open page: {e}")))?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
        })
    }

    async fn eval_bool(&self, script: String) -> Result<bool, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Eval(e.to_string()))?;
        Ok(result
            .into_value::<serde_json::Value>()
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    /// Poll `document.readyState` until complete or the bound elapses.
    /// A page that never completes is not fatal — content gates decide next.
    async fn await_ready_state(&self, timeout: Duration) {
        let poll = Duration::from_millis(250);
        let start = tokio::time::Instant::now();
        loop {
            let complete = self
                .eval_bool("document.readyState === 'complete'".to_string())
                .await
                .unwrap_or(false);
            if complete {
                return;
            }
            if start.elapsed() >= timeout {
                debug!("page did not reach readyState=complete within {:?}", timeout);
                return;
            }
            tokio::time::sleep(poll).await;
        }
    }
}

const NAVIGATE_READY_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
impl Driver for CdpSession {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!(%url, "navigate");
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigate {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.await_ready_state(NAVIGATE_READY_TIMEOUT).await;
        Ok(())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError> {
        let script = match locator {
            Locator::Css(sel) => {
                format!("document.querySelector({}) !== null", js_str(sel))
            }
            Locator::Text { tag, needle } => format!(
                "Array.from(document.querySelectorAll({})).some(el => (el.textContent || '').includes({}))",
                js_str(tag),
                js_str(needle)
            ),
        };
        self.eval_bool(script).await
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        match locator {
            Locator::Css(sel) => {
                let element = self
                    .page
                    .find_element(sel.as_str())
                    .await
                    .map_err(|e| DriverError::Eval(format!("find {sel}: {e}")))?;
                element
                    .click()
                    .await
                    .map_err(|e| DriverError::Eval(format!("click {sel}: {e}")))?;
                Ok(())
            }
            Locator::Text { tag, needle } => {
                let script = format!(
                    "(() => {{ const el = Array.from(document.querySelectorAll({})).find(el => (el.textContent || '').includes({})); if (!el) return false; el.click(); return true; }})()",
                    js_str(tag),
                    js_str(needle)
                );
                if self.eval_bool(script).await? {
                    Ok(())
                } else {
                    Err(DriverError::Eval(format!("click target vanished: {locator}")))
                }
            }
        }
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.page
            .content()
            .await
            .map_err(|e| DriverError::Eval(format!("page content: {e}")))
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            browser
                .close()
                .await
                .map_err(|e| DriverError::Eval(format!("browser close: {e}")))?;
            info!("browser session closed");
        }
        Ok(())
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        // Best-effort cleanup; Drop cannot await. Inside a tokio runtime,
        // spawn a task so an unclosed session does not leak the OS process.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if let Ok(mut guard) = self.browser.try_lock() {
            if let Some(mut browser) = guard.take() {
                handle.spawn(async move {
                    let _ = browser.close().await;
                });
            }
        }
    }
}

/// Quote a Rust string as a JS string literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_str_escapes_quotes_and_backslashes() {
        assert_eq!(js_str("plain"), r#""plain""#);
        assert_eq!(js_str(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_str("a\\b"), r#""a\\b""#);
    }

    #[test]
    fn user_agent_pool_is_non_empty_and_desktop() {
        let ua = pick_user_agent();
        assert!(ua.contains("Mozilla/5.0"));
    }
}
