use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Sentinel values. Fields are always present in the output schema; these
// strings mark "could not be extracted", distinct from true absence.
pub const NO_DESCRIPTION: &str = "No description available";
pub const NO_EMAIL: &str = "No email available";
pub const NO_WEBSITE: &str = "No website available";
pub const NO_INSTAGRAM: &str = "No Instagram available";
pub const NO_IMAGE: &str = "No image available";
pub const ADDRESS_NOT_FOUND: &str = "Address not found";
pub const NOT_AVAILABLE: &str = "N/A";
pub const ERROR_VALUE: &str = "Error";
pub const ERROR_FETCHING: &str = "Error fetching data";

/// A record's projection onto a fixed, rectangular table.
///
/// Column order is declared once per record kind; `row` must produce exactly
/// `columns().len()` cells for every record, regardless of which fields
/// resolved to sentinels.
pub trait TableRecord {
    fn columns() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

/// Minimal record identity discovered during catalog discovery, before any
/// detail-page visit. `detail_link` is always absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStub {
    pub name: String,
    pub detail_link: String,
    pub thumbnail: String,
}

impl RecordStub {
    pub fn new(
        name: impl Into<String>,
        detail_link: impl Into<String>,
        thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            detail_link: detail_link.into(),
            thumbnail: thumbnail.into(),
        }
    }
}

/// One student organization, fully extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRecord {
    pub name: String,
    pub description: String,
    pub email: String,
    pub website: String,
    pub instagram: String,
    pub thumbnail: String,
}

impl OrgRecord {
    /// The degraded form used when the detail visit itself failed. Identity
    /// fields from the stub survive; extracted fields carry error sentinels.
    pub fn error_for(stub: &RecordStub) -> Self {
        Self {
            name: stub.name.clone(),
            description: ERROR_FETCHING.to_string(),
            email: ERROR_VALUE.to_string(),
            website: ERROR_VALUE.to_string(),
            instagram: ERROR_VALUE.to_string(),
            thumbnail: stub.thumbnail.clone(),
        }
    }
}

impl TableRecord for OrgRecord {
    fn columns() -> &'static [&'static str] {
        &[
            "Name",
            "Description",
            "Email",
            "Website",
            "Instagram",
            "Image_Source",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.description.clone(),
            self.email.clone(),
            self.website.clone(),
            self.instagram.clone(),
            self.thumbnail.clone(),
        ]
    }
}

/// One dining location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub link: String,
    pub address: String,
}

impl LocationRecord {
    pub fn error_for(stub: &RecordStub) -> Self {
        Self {
            name: stub.name.clone(),
            link: stub.detail_link.clone(),
            address: ERROR_VALUE.to_string(),
        }
    }
}

impl TableRecord for LocationRecord {
    fn columns() -> &'static [&'static str] {
        &["Name", "Link", "Address"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.link.clone(), self.address.clone()]
    }
}

/// One menu item, keyed by (location, meal, date). Re-scraped every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemRecord {
    pub location_name: String,
    pub meal_type: String,
    pub date: String,
    pub item_name: String,
    /// First digit run of the source text, or `"N/A"`.
    pub calories: String,
    /// Ordered set so serialization is deterministic across runs.
    pub dietary_traits: BTreeSet<String>,
}

impl TableRecord for MenuItemRecord {
    fn columns() -> &'static [&'static str] {
        &["Location", "Meal", "Date", "Item", "Calories", "Dietary_Traits"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.location_name.clone(),
            self.meal_type.clone(),
            self.date.clone(),
            self.item_name.clone(),
            self.calories.clone(),
            self.dietary_traits
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_error_record_keeps_identity_fields() {
        let stub = RecordStub::new("Club A", "https://x.test/a", "https://x.test/a.png");
        let rec = OrgRecord::error_for(&stub);
        assert_eq!(rec.name, "Club A");
        assert_eq!(rec.thumbnail, "https://x.test/a.png");
        assert_eq!(rec.description, ERROR_FETCHING);
        assert_eq!(rec.email, ERROR_VALUE);
    }

    #[test]
    fn row_width_matches_declared_columns() {
        let stub = RecordStub::new("Club A", "https://x.test/a", NO_IMAGE);
        let rec = OrgRecord::error_for(&stub);
        assert_eq!(rec.row().len(), OrgRecord::columns().len());

        let item = MenuItemRecord {
            location_name: "Market".into(),
            meal_type: "lunch".into(),
            date: "2026-08-04".into(),
            item_name: "Soup".into(),
            calories: NOT_AVAILABLE.into(),
            dietary_traits: BTreeSet::new(),
        };
        assert_eq!(item.row().len(), MenuItemRecord::columns().len());
    }

    #[test]
    fn dietary_traits_serialize_in_stable_order() {
        let mut traits = BTreeSet::new();
        traits.insert("vegan".to_string());
        traits.insert("gluten-free".to_string());
        let item = MenuItemRecord {
            location_name: "Market".into(),
            meal_type: "dinner".into(),
            date: "2026-08-04".into(),
            item_name: "Salad".into(),
            calories: "120".into(),
            dietary_traits: traits,
        };
        assert_eq!(item.row()[5], "gluten-free, vegan");
    }
}
