//! Lenient parsing of loosely typed import fields.

use chrono::NaiveDate;
use serde_json::Value;

/// Trims whitespace and trailing commas from a URL.
#[must_use]
pub fn clean_url(raw: &str) -> String {
    raw.trim().trim_end_matches(',').trim().to_string()
}

/// Extracts a cleaned, de-duplicated URL list from a loosely typed field.
///
/// Accepts an array of strings, an array of mixed values, or one string
/// delimited by newlines, carriage returns, or commas. Order is preserved.
#[must_use]
pub fn parse_image_urls(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::String(s) => s.split(['\n', '\r', ',']).map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut urls: Vec<String> = Vec::with_capacity(raw.len());
    for url in raw.iter().map(|s| clean_url(s)) {
        if !url.is_empty() && !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Parses `YYYY-MM-DD`, also accepting a trailing time part.
///
/// Returns `None` for blank or malformed input.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
