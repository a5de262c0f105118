//! SKU generation helpers.
//!
//! The database sequence is the primary source. When it is unavailable a
//! timestamp plus random suffix is used instead.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Formats a sequence value as `SKU-000123`.
#[must_use]
pub fn format_sku(sequence: i64) -> String {
    format!("SKU-{sequence:06}")
}

/// Builds `SKU-<millis>-<hex>` from the clock and 32 random bits.
#[must_use]
pub fn fallback_sku(now: DateTime<Utc>) -> String {
    let entropy: u32 = rand::rng().random();
    format!("SKU-{}-{entropy:08X}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format_sku_pads() {
        assert_eq!(format_sku(7), "SKU-000007");
        assert_eq!(format_sku(1_234_567), "SKU-1234567");
    }

    #[test]
    fn test_fallback_sku_is_never_empty_and_distinct() {
        let now = Utc::now();
        let skus: HashSet<String> = (0..1_000).map(|_| fallback_sku(now)).collect();
        assert!(skus.len() >= 999);
        assert!(skus.iter().all(|sku| sku.starts_with("SKU-")));
    }
}
