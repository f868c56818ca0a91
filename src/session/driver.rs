use crate::core::error::DriverError;
use async_trait::async_trait;
use std::fmt;

/// Where to look for an element on the live page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// Any element of `tag` whose visible text contains `needle`.
    Text { tag: String, needle: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(tag: impl Into<String>, needle: impl Into<String>) -> Self {
        Locator::Text {
            tag: tag.into(),
            needle: needle.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(sel) => write!(f, "css({sel})"),
            Locator::Text { tag, needle } => write!(f, "text({tag} ~ {needle:?})"),
        }
    }
}

/// The browser-automation surface the pipeline drives.
///
/// One implementation talks CDP (`session::cdp`); tests substitute scripted
/// in-memory drivers so every wait point is exercisable without a browser.
/// All waiting/polling lives above this trait (`session::wait`) — `exists`
/// answers "is it there right now", nothing more.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError>;

    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Current rendered markup of the page.
    async fn page_source(&self) -> Result<String, DriverError>;

    /// Release the underlying session. Idempotent.
    async fn close(&self) -> Result<(), DriverError>;
}
