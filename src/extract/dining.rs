//! Dining flow: entry gates, location records, and nested menu-item
//! extraction.
//!
//! The dining site fronts its content with a sequence of UI gates; after
//! those, the listing yields location stubs, each location page yields an
//! address, and each meal page yields a repeated item container. Menu
//! extraction is nested: first the container chain picks the item elements,
//! then per-item field fallbacks run inside each element.

use crate::core::config::TimingSettings;
use crate::core::types::{
    LocationRecord, MenuItemRecord, RecordStub, ADDRESS_NOT_FOUND, NOT_AVAILABLE,
};
use crate::extract::fallback::{FallbackChain, Strategy};
use crate::extract::text::{clean_text, first_digit_run};
use crate::session::driver::Locator;
use crate::session::gates::{GateAction, GateSpec};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

/// The gates between the landing page and the location listing: the menus
/// entry button, the onboarding confirmation, and the location-permission
/// dialog. The first two block all content; the permission dialog may not
/// appear at all (the launch flags auto-answer the browser-native prompt).
pub fn entry_gates(timing: &TimingSettings) -> Vec<GateSpec> {
    vec![
        GateSpec::required(
            "view-menus",
            vec![
                Locator::css("button.primary[data-testid='018026bcdb3445168421175d9ae4dd06']"),
                Locator::text("button", "View Menus"),
            ],
            GateAction::Click,
            timing.gate_timeout(),
        ),
        GateSpec::required(
            "lets-do-it",
            vec![
                Locator::text("button", "Let's do it"),
                Locator::css("button.primary.button-center"),
            ],
            GateAction::Click,
            timing.gate_timeout(),
        ),
        GateSpec::optional(
            "allow-location",
            vec![Locator::text("button", "Allow")],
            GateAction::Accept,
            timing.permission_timeout(),
        ),
    ]
}

/// Ready signal once the location listing has rendered.
pub fn listing_ready_signal() -> Locator {
    Locator::css("a[href*='menu']")
}

/// Ready signal for a location's detail page.
pub fn location_ready_signal() -> Locator {
    Locator::css("div.address")
}

/// Ready signal for a meal menu page (any known item container).
pub fn menu_ready_signal() -> Locator {
    Locator::css(ITEM_CONTAINER_SELECTORS.join(", "))
}

/// Menu URL for one meal on one date, e.g. `<location>/lunch/2026-08-04`.
pub fn menu_url(location_link: &str, meal_type: &str, date: &str) -> String {
    format!("{}/{meal_type}/{date}", location_link.trim_end_matches('/'))
}

const ITEM_CONTAINER_SELECTORS: [&str; 3] = [".menu-item", "li.food", ".food-card"];
const ITEM_NAME_SELECTORS: [&str; 3] = [".food-name", ".item-name", "h4"];
const ITEM_CALORIE_SELECTORS: [&str; 3] = [".food-calories", ".calories", ".nutrition-summary"];
const TRAIT_ICON_SELECTORS: [&str; 2] = [".food-icons img[alt]", "img.food-icon[alt]"];
const TRAIT_TAG_SELECTORS: [&str; 2] = [".food-tags span", ".dietary-tag"];

pub struct LocationExtractor {
    address: FallbackChain,
}

impl LocationExtractor {
    pub fn new() -> Self {
        let address = FallbackChain::new("address", ADDRESS_NOT_FOUND)
            .strategy(Strategy::css_text("address-div", "div.address"))
            .strategy(Strategy::css_text("address-tag", "address"))
            .strategy(Strategy::css_text("location-address", ".location-address"));
        Self { address }
    }

    /// Total: a page with no address block yields the address sentinel.
    pub fn extract(&self, stub: &RecordStub, markup: &str) -> LocationRecord {
        let doc = Html::parse_document(markup);
        LocationRecord {
            name: stub.name.clone(),
            link: stub.detail_link.clone(),
            address: self.address.resolve(&doc),
        }
    }
}

impl Default for LocationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MenuExtractor;

impl MenuExtractor {
    pub fn new() -> Self {
        Self
    }

    /// All items on one meal page. The container chain picks the first
    /// selector with any matches; an empty page is an empty list, not an
    /// error. Containers that yield no item name are not records and are
    /// skipped.
    pub fn extract_items(
        &self,
        location_name: &str,
        meal_type: &str,
        date: &str,
        markup: &str,
    ) -> Vec<MenuItemRecord> {
        let doc = Html::parse_document(markup);
        let containers = first_nonempty_selection(&doc, &ITEM_CONTAINER_SELECTORS);

        containers
            .iter()
            .filter_map(|element| self.extract_item(location_name, meal_type, date, element))
            .collect()
    }

    fn extract_item(
        &self,
        location_name: &str,
        meal_type: &str,
        date: &str,
        element: &ElementRef,
    ) -> Option<MenuItemRecord> {
        let item_name = first_text(element, &ITEM_NAME_SELECTORS)?;
        let calories = first_text(element, &ITEM_CALORIE_SELECTORS)
            .and_then(|t| first_digit_run(&t))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Some(MenuItemRecord {
            location_name: location_name.to_string(),
            meal_type: meal_type.to_string(),
            date: date.to_string(),
            item_name,
            calories,
            dietary_traits: dietary_traits(element),
        })
    }
}

impl Default for MenuExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Matches for the first container selector that yields anything.
fn first_nonempty_selection<'a>(doc: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for selector in selectors {
        if let Ok(sel) = Selector::parse(selector) {
            let matches: Vec<_> = doc.select(&sel).collect();
            if !matches.is_empty() {
                return matches;
            }
        }
    }
    Vec::new()
}

/// First non-empty text under any of `selectors`, scoped to `element`.
fn first_text(element: &ElementRef, selectors: &[&str]) -> Option<String> {
    for selector in selectors {
        if let Ok(sel) = Selector::parse(selector) {
            for matched in element.select(&sel) {
                let text = clean_text(&matched.text().collect::<String>());
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Icon alt-text first, tag labels second; both tiers can contribute.
fn dietary_traits(element: &ElementRef) -> BTreeSet<String> {
    let mut traits = BTreeSet::new();

    for selector in TRAIT_ICON_SELECTORS {
        if let Ok(sel) = Selector::parse(selector) {
            for icon in element.select(&sel) {
                if let Some(alt) = icon.value().attr("alt") {
                    let alt = clean_text(alt);
                    if !alt.is_empty() {
                        traits.insert(alt);
                    }
                }
            }
        }
    }

    if traits.is_empty() {
        for selector in TRAIT_TAG_SELECTORS {
            if let Ok(sel) = Selector::parse(selector) {
                for tag in element.select(&sel) {
                    let label = clean_text(&tag.text().collect::<String>());
                    if !label.is_empty() {
                        traits.insert(label);
                    }
                }
            }
        }
    }

    traits
}
