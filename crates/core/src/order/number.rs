//! Human-readable order numbers.

use chrono::NaiveDate;
use rand::Rng;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 6;

/// Generates `ORD-YYYYMMDD-XXXXXX` with a random base-36 suffix.
#[must_use]
pub fn generate_order_number(date: NaiveDate) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect();
    format!("ORD-{}-{suffix}", date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let number = generate_order_number(date);

        assert_eq!(number.len(), "ORD-20260309-".len() + SUFFIX_LEN);
        assert!(number.starts_with("ORD-20260309-"));
        assert!(
            number[13..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_order_numbers_vary() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let numbers: std::collections::HashSet<_> =
            (0..50).map(|_| generate_order_number(date)).collect();
        assert!(numbers.len() > 45);
    }
}
