//! Selector predicates: the demographic filters attached to a quota cell,
//! and the helpers that turn them into bank-gateway queries or sample
//! attribute matches.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One value in a selector: either a single expected value, or a set of
/// acceptable values (an `IN`-style match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorValue {
    Scalar(String),
    List(Vec<String>),
}

impl SelectorValue {
    fn contains(&self, actual: &str) -> bool {
        match self {
            SelectorValue::Scalar(expected) => expected == actual,
            SelectorValue::List(expected) => expected.iter().any(|v| v == actual),
        }
    }
}

/// A cell's demographic filter: an ordered map of attribute key to expected
/// value(s). Empty selector matches everything.
pub type Selector = BTreeMap<String, SelectorValue>;

const PROMOTED_COLUMNS: [&str; 4] = ["gender", "age_band", "province_code", "city_code"];

/// Resolve the value of a sample attribute `key`: promoted columns read
/// from dedicated struct fields via `promoted`, everything else from the
/// free-form `attributes` map.
pub fn matches_selector<F>(selector: &Selector, promoted: F, attributes: &serde_json::Value) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    for (key, expected) in selector {
        let actual = if PROMOTED_COLUMNS.contains(&key.as_str()) {
            promoted(key)
        } else {
            attributes
                .get(key)
                .and_then(|v| v.as_str().map(ToString::to_string))
        };

        match actual {
            Some(actual) if expected.contains(&actual) => continue,
            _ => return false,
        }
    }
    true
}

/// An age range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min_age: u32,
    pub max_age: u32,
}

/// Parse an age-band string ("18-24" or "65+") into an inclusive range.
/// `"A+"` means `[A, 120]`. Returns `None` for malformed input.
pub fn parse_age_band(band: &str) -> Option<AgeRange> {
    let band = band.trim();
    if let Some(lower) = band.strip_suffix('+') {
        let min_age: u32 = lower.trim().parse().ok()?;
        return Some(AgeRange { min_age, max_age: 120 });
    }
    let (lower, upper) = band.split_once('-')?;
    let min_age: u32 = lower.trim().parse().ok()?;
    let max_age: u32 = upper.trim().parse().ok()?;
    if min_age > max_age {
        return None;
    }
    Some(AgeRange { min_age, max_age })
}

/// Compute age in whole years as of `today`, stable for the lifetime of a
/// single call (the caller samples `today` once, not per row).
pub fn calculate_age(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - dob.year();
    let had_birthday_this_year = (today.month(), today.day()) >= (dob.month(), dob.day());
    if !had_birthday_this_year {
        age -= 1;
    }
    age.max(0) as u32
}

/// Find the first age band (in declaration order) whose range contains `age`.
pub fn first_matching_band(bands: &[String], age: u32) -> Option<String> {
    bands
        .iter()
        .find(|band| parse_age_band(band).is_some_and(|r| r.min_age <= age && age <= r.max_age))
        .cloned()
}

/// Normalise a selector value into a list of strings for an equality/`IN`
/// filter, as the bank gateway needs.
pub fn normalize_filter_values(value: &SelectorValue) -> Vec<String> {
    match value {
        SelectorValue::Scalar(s) => vec![s.clone()],
        SelectorValue::List(list) => list.clone(),
    }
}

/// A normalised predicate the bank gateway can execute directly against
/// `bank.bank_person` / `bank.bank_phone`.
#[derive(Debug, Clone, Default)]
pub struct SelectorPredicate {
    pub gender_in: Option<Vec<String>>,
    pub province_code_in: Option<Vec<String>>,
    pub city_code_in: Option<Vec<String>>,
    pub age_ranges: Vec<AgeRange>,
    pub age_bands: Vec<String>,
}

impl SelectorPredicate {
    /// Split a cell's selector into the gateway's equality filters and age
    /// ranges. Age is carried either as an explicit `age_range`
    /// (`{min_age, max_age}` as the selector's scalar value, in `"min-max"`
    /// form) or as one or more `age_band` strings.
    pub fn from_selector(selector: &Selector) -> Self {
        let mut predicate = SelectorPredicate::default();

        if let Some(v) = selector.get("gender") {
            predicate.gender_in = Some(normalize_filter_values(v));
        }
        if let Some(v) = selector.get("province_code") {
            predicate.province_code_in = Some(normalize_filter_values(v));
        }
        if let Some(v) = selector.get("city_code") {
            predicate.city_code_in = Some(normalize_filter_values(v));
        }
        if let Some(v) = selector.get("age_range") {
            for raw in normalize_filter_values(v) {
                if let Some(range) = parse_age_band(&raw) {
                    predicate.age_ranges.push(range);
                }
            }
        }
        if let Some(v) = selector.get("age_band") {
            predicate.age_bands = normalize_filter_values(v);
            for band in &predicate.age_bands {
                if let Some(range) = parse_age_band(band) {
                    predicate.age_ranges.push(range);
                }
            }
        }

        predicate
    }

    /// `today`'s date is computed once by the caller and threaded through,
    /// so every candidate in one gateway call is aged against the same day.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_age_band_range() {
        assert_eq!(parse_age_band("18-24"), Some(AgeRange { min_age: 18, max_age: 24 }));
    }

    #[test]
    fn test_parse_age_band_plus() {
        assert_eq!(parse_age_band("65+"), Some(AgeRange { min_age: 65, max_age: 120 }));
    }

    #[test]
    fn test_parse_age_band_malformed() {
        assert_eq!(parse_age_band("abc"), None);
        assert_eq!(parse_age_band("30-20"), None);
    }

    #[test]
    fn test_calculate_age_before_birthday() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert_eq!(calculate_age(dob, today), 25);
    }

    #[test]
    fn test_calculate_age_after_birthday() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 6, 20).unwrap();
        assert_eq!(calculate_age(dob, today), 26);
    }

    #[test]
    fn test_first_matching_band() {
        let bands = vec!["18-24".to_string(), "25-34".to_string(), "65+".to_string()];
        assert_eq!(first_matching_band(&bands, 30), Some("25-34".to_string()));
        assert_eq!(first_matching_band(&bands, 70), Some("65+".to_string()));
        assert_eq!(first_matching_band(&bands, 10), None);
    }

    #[test]
    fn test_matches_selector_empty_matches_all() {
        let selector = Selector::new();
        assert!(matches_selector(&selector, |_| None, &serde_json::json!({})));
    }

    #[test]
    fn test_matches_selector_promoted_column() {
        let mut selector = Selector::new();
        selector.insert("gender".to_string(), SelectorValue::Scalar("female".to_string()));
        let attrs = serde_json::json!({});
        assert!(matches_selector(&selector, |k| (k == "gender").then(|| "female".to_string()), &attrs));
        assert!(!matches_selector(&selector, |k| (k == "gender").then(|| "male".to_string()), &attrs));
    }

    #[test]
    fn test_matches_selector_list_membership() {
        let mut selector = Selector::new();
        selector.insert(
            "province_code".to_string(),
            SelectorValue::List(vec!["10".to_string(), "20".to_string()]),
        );
        let attrs = serde_json::json!({});
        assert!(matches_selector(&selector, |_| Some("20".to_string()), &attrs));
        assert!(!matches_selector(&selector, |_| Some("30".to_string()), &attrs));
    }

    #[test]
    fn test_matches_selector_missing_attribute_is_non_match() {
        let mut selector = Selector::new();
        selector.insert("custom_key".to_string(), SelectorValue::Scalar("x".to_string()));
        let attrs = serde_json::json!({});
        assert!(!matches_selector(&selector, |_| None, &attrs));
    }

    #[test]
    fn test_matches_selector_free_form_attribute() {
        let mut selector = Selector::new();
        selector.insert("education".to_string(), SelectorValue::Scalar("bachelor".to_string()));
        let attrs = serde_json::json!({"education": "bachelor"});
        assert!(matches_selector(&selector, |_| None, &attrs));
    }
}
