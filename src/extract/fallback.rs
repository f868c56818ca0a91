//! Ordered extraction strategies with a declared sentinel.
//!
//! Each strategy is a pure function over the parsed page tree returning
//! `Some(value)` or `None` ("not applicable" — a missing node, a malformed
//! match, and a query failure all land here). The chain walks strategies in
//! declared order and short-circuits on the first non-empty value; exhaustion
//! resolves to the sentinel, never an error.

use crate::extract::text::clean_text;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, trace};

type ApplyFn = Arc<dyn Fn(&Html) -> Option<String> + Send + Sync>;
type PostFn = Arc<dyn Fn(String) -> Option<String> + Send + Sync>;

/// A named extraction rule. Built from a CSS shortcut or an arbitrary
/// closure, optionally post-processed.
#[derive(Clone)]
pub struct Strategy {
    name: &'static str,
    apply: ApplyFn,
}

impl Strategy {
    pub fn new(
        name: &'static str,
        apply: impl Fn(&Html) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            apply: Arc::new(apply),
        }
    }

    /// First match's whitespace-collapsed text for `selector`.
    pub fn css_text(name: &'static str, selector: &'static str) -> Self {
        Self::new(name, move |doc| {
            let sel = Selector::parse(selector).ok()?;
            for element in doc.select(&sel) {
                let text = clean_text(&element.text().collect::<String>());
                if !text.is_empty() {
                    return Some(text);
                }
            }
            None
        })
    }

    /// First match's `attr` value for `selector`.
    pub fn css_attr(name: &'static str, selector: &'static str, attr: &'static str) -> Self {
        Self::new(name, move |doc| {
            let sel = Selector::parse(selector).ok()?;
            for element in doc.select(&sel) {
                if let Some(value) = element.value().attr(attr) {
                    let value = value.trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
            None
        })
    }

    /// Post-process the extracted value; `None` downgrades this strategy to
    /// not-applicable so the chain moves on.
    pub fn map(self, post: impl Fn(String) -> Option<String> + Send + Sync + 'static) -> Self {
        let post: PostFn = Arc::new(post);
        let inner = self.apply;
        Self {
            name: self.name,
            apply: Arc::new(move |doc| inner(doc).and_then(|v| post(v))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn apply(&self, doc: &Html) -> Option<String> {
        (self.apply)(doc)
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// One field's ordered strategies plus its sentinel.
#[derive(Clone, Debug)]
pub struct FallbackChain {
    field: &'static str,
    strategies: Vec<Strategy>,
    sentinel: String,
}

impl FallbackChain {
    pub fn new(field: &'static str, sentinel: impl Into<String>) -> Self {
        Self {
            field,
            strategies: Vec::new(),
            sentinel: sentinel.into(),
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// First non-empty strategy value, else the sentinel. Deterministic:
    /// strategies run in declared order and nothing past the winner runs.
    pub fn resolve(&self, doc: &Html) -> String {
        for strategy in &self.strategies {
            if let Some(value) = strategy.apply(doc) {
                let value = value.trim();
                if !value.is_empty() {
                    trace!(field = self.field, strategy = strategy.name(), "strategy matched");
                    return value.to_string();
                }
            }
        }
        debug!(field = self.field, "all strategies exhausted, using sentinel");
        self.sentinel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn first_successful_strategy_wins() {
        let page = doc(r#"<p class="a">alpha</p><p class="b">beta</p>"#);
        let chain = FallbackChain::new("field", "none")
            .strategy(Strategy::css_text("a", "p.a"))
            .strategy(Strategy::css_text("b", "p.b"));
        assert_eq!(chain.resolve(&page), "alpha");
    }

    #[test]
    fn no_strategy_past_the_winner_executes() {
        let miss = Arc::new(AtomicUsize::new(0));
        let hit = Arc::new(AtomicUsize::new(0));
        let never = Arc::new(AtomicUsize::new(0));

        let chain = FallbackChain::new("field", "none")
            .strategy(Strategy::new("miss", {
                let miss = Arc::clone(&miss);
                move |_| {
                    miss.fetch_add(1, Ordering::SeqCst);
                    None
                }
            }))
            .strategy(Strategy::new("hit", {
                let hit = Arc::clone(&hit);
                move |_| {
                    hit.fetch_add(1, Ordering::SeqCst);
                    Some("value".to_string())
                }
            }))
            .strategy(Strategy::new("never", {
                let never = Arc::clone(&never);
                move |_| {
                    never.fetch_add(1, Ordering::SeqCst);
                    Some("shadowed".to_string())
                }
            }));

        assert_eq!(chain.resolve(&doc("")), "value");
        assert_eq!(miss.load(Ordering::SeqCst), 1);
        assert_eq!(hit.load(Ordering::SeqCst), 1);
        assert_eq!(never.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhaustion_returns_sentinel() {
        let chain = FallbackChain::new("email", "No email available")
            .strategy(Strategy::css_text("missing", ".nope"));
        assert_eq!(chain.resolve(&doc("<p>hello</p>")), "No email available");
    }

    #[test]
    fn empty_value_counts_as_not_applicable() {
        let page = doc(r#"<p class="a">   </p><p class="b">real</p>"#);
        let chain = FallbackChain::new("field", "none")
            .strategy(Strategy::css_text("blank", "p.a"))
            .strategy(Strategy::css_text("real", "p.b"));
        assert_eq!(chain.resolve(&page), "real");
    }

    #[test]
    fn invalid_selector_is_not_applicable_not_fatal() {
        let page = doc(r#"<p class="a">alpha</p>"#);
        let chain = FallbackChain::new("field", "none")
            .strategy(Strategy::css_text("broken", "p[[["))
            .strategy(Strategy::css_text("ok", "p.a"));
        assert_eq!(chain.resolve(&page), "alpha");
    }

    #[test]
    fn map_none_moves_chain_along() {
        let page = doc(r#"<span class="cal">Cal info unavailable</span>"#);
        let chain = FallbackChain::new("calories", "N/A").strategy(
            Strategy::css_text("cal", "span.cal")
                .map(|v| crate::extract::text::first_digit_run(&v)),
        );
        assert_eq!(chain.resolve(&page), "N/A");
    }

    #[test]
    fn resolution_is_idempotent_over_a_fixed_snapshot() {
        let page = doc(r#"<p class="a">alpha</p><p class="b">beta</p>"#);
        let chain = FallbackChain::new("field", "none")
            .strategy(Strategy::css_text("a", "p.a"))
            .strategy(Strategy::css_text("b", "p.b"));
        let first = chain.resolve(&page);
        let second = chain.resolve(&page);
        assert_eq!(first, second);
    }

    #[test]
    fn css_attr_extracts_attribute() {
        let page = doc(r#"<a class="site" href="https://example.org">site</a>"#);
        let chain = FallbackChain::new("website", "none")
            .strategy(Strategy::css_attr("href", "a.site", "href"));
        assert_eq!(chain.resolve(&page), "https://example.org");
    }
}
