//! Organization detail-page extraction.
//!
//! One fallback chain per field. Link classification prefers label/ARIA text
//! over raw URL shape; the URL heuristic is the last resort. The extractor is
//! total — a page where nothing matches yields a record of sentinels.

use crate::core::types::{
    OrgRecord, RecordStub, NO_DESCRIPTION, NO_EMAIL, NO_INSTAGRAM, NO_WEBSITE,
};
use crate::extract::fallback::{FallbackChain, Strategy};
use crate::extract::text::{clean_text, find_email};
use crate::session::driver::Locator;
use scraper::{ElementRef, Html, Selector};

/// Hosts that are never "the website" even though they are external links.
const SOCIAL_HOST_FRAGMENTS: &[&str] = &[
    "instagram",
    "facebook",
    "linkedin",
    "youtube",
    "twitter",
    "calendar.google",
];

/// Signals the detail page has rendered its user-supplied body.
pub fn detail_ready_signal() -> Locator {
    Locator::css(".bodyText-large.userSupplied")
}

/// Ready signal for the organizations listing.
pub fn listing_ready_signal() -> Locator {
    Locator::css("ul.MuiList-root")
}

/// The incremental-pagination trigger on the listing page.
pub fn load_more_trigger() -> Locator {
    Locator::text("span", "Load More")
}

pub struct OrgExtractor {
    description: FallbackChain,
    email: FallbackChain,
    website: FallbackChain,
    instagram: FallbackChain,
}

impl OrgExtractor {
    pub fn new() -> Self {
        let description = FallbackChain::new("description", NO_DESCRIPTION).strategy(
            Strategy::css_text("user-supplied-body", ".bodyText-large.userSupplied"),
        );

        let email = FallbackChain::new("email", NO_EMAIL)
            .strategy(Strategy::new("labeled-contact-span", email_from_labeled_span))
            .strategy(Strategy::new("e-prefixed-div", email_from_e_prefixed_div))
            .strategy(Strategy::new("page-wide-scan", email_from_anywhere));

        let website = FallbackChain::new("website", NO_WEBSITE)
            .strategy(Strategy::new("aria-visit-our-site", |doc| {
                anchor_href_by_aria(doc, "visit our site")
            }))
            .strategy(Strategy::new("globe-icon-anchor", anchor_href_with_globe_icon))
            .strategy(Strategy::new("external-non-social", first_external_non_social));

        let instagram = FallbackChain::new("instagram", NO_INSTAGRAM)
            .strategy(Strategy::new("aria-instagram", |doc| {
                anchor_href_by_aria(doc, "instagram")
            }))
            .strategy(Strategy::new("instagram-host", anchor_href_to_instagram));

        Self {
            description,
            email,
            website,
            instagram,
        }
    }

    /// Build the full record. Never fails; fields degrade independently to
    /// their sentinels.
    pub fn extract(&self, stub: &RecordStub, markup: &str) -> OrgRecord {
        let doc = Html::parse_document(markup);
        OrgRecord {
            name: stub.name.clone(),
            description: self.description.resolve(&doc),
            email: self.email.resolve(&doc),
            website: self.website.resolve(&doc),
            instagram: self.instagram.resolve(&doc),
            thumbnail: stub.thumbnail.clone(),
        }
    }
}

impl Default for OrgExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Screen-reader label "Contact Email" marks the contact block; the address
/// lives in the surrounding element's text.
fn email_from_labeled_span(doc: &Html) -> Option<String> {
    let sel = Selector::parse("span.sr-only").ok()?;
    for span in doc.select(&sel) {
        if clean_text(&span.text().collect::<String>()) != "Contact Email" {
            continue;
        }
        if let Some(parent) = span.parent().and_then(ElementRef::wrap) {
            if let Some(email) = find_email(&parent.text().collect::<String>()) {
                return Some(email);
            }
        }
    }
    None
}

/// Leaf divs whose text is an `E:`-prefixed contact line.
fn email_from_e_prefixed_div(doc: &Html) -> Option<String> {
    let sel = Selector::parse("div").ok()?;
    for div in doc.select(&sel) {
        if div.children().any(|child| child.value().is_element()) {
            continue;
        }
        let text = div.text().collect::<String>();
        if text.contains("E:") {
            if let Some(email) = find_email(&text) {
                return Some(email);
            }
        }
    }
    None
}

fn email_from_anywhere(doc: &Html) -> Option<String> {
    find_email(&doc.root_element().html())
}

fn anchor_href_by_aria(doc: &Html, needle: &str) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    for anchor in doc.select(&sel) {
        let aria = anchor
            .value()
            .attr("aria-label")
            .unwrap_or_default()
            .to_lowercase();
        if aria.contains(needle) {
            return anchor.value().attr("href").map(str::to_string);
        }
    }
    None
}

/// Anchors rendering a globe icon are the site link even without a label.
fn anchor_href_with_globe_icon(doc: &Html) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    for anchor in doc.select(&sel) {
        if anchor.html().to_lowercase().contains("globe") {
            return anchor.value().attr("href").map(str::to_string);
        }
    }
    None
}

/// Last resort: the first external link that is not a known social host.
fn first_external_non_social(doc: &Html) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    for anchor in doc.select(&sel) {
        let href = anchor.value().attr("href").unwrap_or_default();
        if !href.starts_with("http") {
            continue;
        }
        let lower = href.to_lowercase();
        if SOCIAL_HOST_FRAGMENTS.iter().any(|s| lower.contains(s)) {
            continue;
        }
        return Some(href.to_string());
    }
    None
}

fn anchor_href_to_instagram(doc: &Html) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    for anchor in doc.select(&sel) {
        let href = anchor.value().attr("href").unwrap_or_default();
        if href.to_lowercase().contains("instagram.com") {
            return Some(href.to_string());
        }
    }
    None
}
