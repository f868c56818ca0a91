//! Text normalization shared by the extraction chains.

use regex::Regex;
use std::sync::OnceLock;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("valid email pattern")
    })
}

/// Collapse all runs of whitespace to single spaces and trim.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First email-shaped token in `s`.
pub fn find_email(s: &str) -> Option<String> {
    email_re().find(s).map(|m| m.as_str().to_string())
}

/// First run of ASCII digits, e.g. `"210 Cal"` → `"210"`. Free text with no
/// digits yields `None` so numeric chains fall through to their sentinel.
pub fn first_digit_run(s: &str) -> Option<String> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    Some(digits)
}
