//! Listing-page parsing: final markup → record stubs.
//!
//! Pure functions of the captured DOM, run exactly once after pagination has
//! finished. Stub order is document order; duplicate names keep the first
//! occurrence so detail visits never revisit a record.

use crate::core::types::{RecordStub, NO_IMAGE};
use crate::extract::text::clean_text;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// First-wins dedup by record name.
pub fn dedup_by_name(stubs: Vec<RecordStub>) -> Vec<RecordStub> {
    let mut seen = HashSet::new();
    stubs
        .into_iter()
        .filter(|stub| seen.insert(stub.name.clone()))
        .collect()
}

/// Organization listing: one stub per card anchor inside the main list.
pub fn parse_org_listing(markup: &str, base: &Url) -> Vec<RecordStub> {
    let doc = Html::parse_document(markup);
    let mut stubs = Vec::new();

    let Ok(anchor_sel) = Selector::parse("ul.MuiList-root a[href]") else {
        return stubs;
    };

    for anchor in doc.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let name = card_title(&anchor);
        if name.is_empty() {
            continue;
        }
        let thumbnail = first_img_src(&anchor)
            .map(|src| absolutize(base, &src))
            .unwrap_or_else(|| NO_IMAGE.to_string());

        stubs.push(RecordStub::new(name, absolutize(base, href), thumbnail));
    }

    dedup_by_name(stubs)
}

/// Dining listing: menu links become location stubs. Anchor text is the
/// location name; fragment-only and overlong entries are navigation noise.
pub fn parse_dining_listing(markup: &str, base: &Url) -> Vec<RecordStub> {
    let doc = Html::parse_document(markup);
    let mut stubs = Vec::new();

    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return stubs;
    };

    for anchor in doc.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.to_lowercase().contains("menu") || href.ends_with('#') {
            continue;
        }
        let name = clean_text(&anchor.text().collect::<String>());
        if name.is_empty() || name.len() >= 50 {
            continue;
        }
        stubs.push(RecordStub::new(name, absolutize(base, href), NO_IMAGE));
    }

    dedup_by_name(stubs)
}

/// Card title fallbacks: the styled title div the site renders, then heading
/// tags, then the anchor's whole text.
fn card_title(anchor: &ElementRef) -> String {
    for selector in ["div[style*='font-size: 1.125rem']", "h2", "h3"] {
        if let Ok(sel) = Selector::parse(selector) {
            if let Some(element) = anchor.select(&sel).next() {
                let title = clean_text(&element.text().collect::<String>());
                if !title.is_empty() {
                    return title;
                }
            }
        }
    }
    clean_text(&anchor.text().collect::<String>())
}

fn first_img_src(anchor: &ElementRef) -> Option<String> {
    let sel = Selector::parse("img[src]").ok()?;
    anchor
        .select(&sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.to_string())
}

/// Resolve relative hrefs against the listing origin; an unparseable href is
/// kept verbatim rather than dropped.
fn absolutize(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://win.wisc.edu").unwrap()
    }

    const LISTING: &str = r#"
        <ul class="MuiList-root MuiList-padding">
          <li><a href="/organization/club-a">
            <img src="/images/a.png">
            <div style="font-size: 1.125rem;">Club A</div>
            <div>Some teaser text</div>
          </a></li>
          <li><a href="/organization/club-b">
            <div style="font-size: 1.125rem;">Club B</div>
          </a></li>
          <li><a href="/organization/club-a-dup">
            <div style="font-size: 1.125rem;">Club A</div>
          </a></li>
        </ul>"#;

    #[test]
    fn parses_stubs_with_absolute_links_and_thumbnails() {
        let stubs = parse_org_listing(LISTING, &base());
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].name, "Club A");
        assert_eq!(stubs[0].detail_link, "https://win.wisc.edu/organization/club-a");
        assert_eq!(stubs[0].thumbnail, "https://win.wisc.edu/images/a.png");
        assert_eq!(stubs[1].name, "Club B");
        assert_eq!(stubs[1].thumbnail, NO_IMAGE);
    }

    #[test]
    fn duplicate_names_keep_first_occurrence() {
        let stubs = parse_org_listing(LISTING, &base());
        let club_a: Vec<_> = stubs.iter().filter(|s| s.name == "Club A").collect();
        assert_eq!(club_a.len(), 1);
        assert!(club_a[0].detail_link.ends_with("/organization/club-a"));
    }

    #[test]
    fn falls_back_to_anchor_text_when_title_div_missing() {
        let markup = r#"
            <ul class="MuiList-root">
              <li><a href="/organization/plain">Plain Name Club</a></li>
            </ul>"#;
        let stubs = parse_org_listing(markup, &base());
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].name, "Plain Name Club");
    }

    #[test]
    fn empty_listing_yields_no_stubs() {
        assert!(parse_org_listing("<html><body></body></html>", &base()).is_empty());
    }

    #[test]
    fn dining_listing_keeps_only_menu_links() {
        let markup = r#"
            <a href="/menu/gordon-avenue-market">Gordon Avenue Market</a>
            <a href="/menu/four-lakes-market">Four Lakes Market</a>
            <a href="/about">About us</a>
            <a href="/menu/ignored#">Skip me</a>"#;
        let b = Url::parse("https://dining.example.test").unwrap();
        let stubs = parse_dining_listing(markup, &b);
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].name, "Gordon Avenue Market");
        assert_eq!(
            stubs[0].detail_link,
            "https://dining.example.test/menu/gordon-avenue-market"
        );
    }

    #[test]
    fn dedup_is_first_wins_over_raw_order() {
        let stubs = vec![
            RecordStub::new("A", "https://x/1", NO_IMAGE),
            RecordStub::new("B", "https://x/2", NO_IMAGE),
            RecordStub::new("A", "https://x/3", NO_IMAGE),
        ];
        let deduped = dedup_by_name(stubs);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].detail_link, "https://x/1");
    }
}
