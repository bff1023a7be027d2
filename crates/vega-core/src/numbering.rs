//! # Business Numbers
//!
//! Human-readable, externally unique numbers printed on receipts.
//!
//! ```text
//! Sale:     20261017-01-0042      YYYYMMDD - terminal - daily sequence
//! Layaway:  L-20261017-0007       L - YYYYMMDD - daily sequence
//! ```
//!
//! The sequence value comes from the `number_sequences` table, keyed by
//! [`sale_sequence_key`] / [`layaway_sequence_key`], so two terminals never
//! share a counter and the counter restarts every day.

use chrono::NaiveDate;

const DAY_FORMAT: &str = "%Y%m%d";

/// `YYYYMMDD-TT-NNNN`. The sequence is padded to at least four digits.
///
/// ```rust
/// use chrono::NaiveDate;
/// use vega_core::numbering::format_sale_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
/// assert_eq!(format_sale_number(day, "01", 42), "20261017-01-0042");
/// ```
pub fn format_sale_number(day: NaiveDate, terminal_code: &str, sequence: i64) -> String {
    format!("{}-{}-{:04}", day.format(DAY_FORMAT), terminal_code, sequence)
}

/// `L-YYYYMMDD-NNNN`.
pub fn format_layaway_number(day: NaiveDate, sequence: i64) -> String {
    format!("L-{}-{:04}", day.format(DAY_FORMAT), sequence)
}

pub fn sale_sequence_key(day: NaiveDate, terminal_code: &str) -> String {
    format!("sale:{}:{}", terminal_code, day.format(DAY_FORMAT))
}

pub fn layaway_sequence_key(day: NaiveDate) -> String {
    format!("layaway:{}", day.format(DAY_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn test_sale_number_padding() {
        assert_eq!(format_sale_number(day(), "T2", 1), "20260105-T2-0001");
        assert_eq!(format_sale_number(day(), "T2", 12_345), "20260105-T2-12345");
    }

    #[test]
    fn test_layaway_number() {
        assert_eq!(format_layaway_number(day(), 7), "L-20260105-0007");
    }

    #[test]
    fn test_sequence_keys_partition_by_terminal_and_day() {
        let next_day = day().succ_opt().unwrap();
        assert_ne!(sale_sequence_key(day(), "01"), sale_sequence_key(day(), "02"));
        assert_ne!(sale_sequence_key(day(), "01"), sale_sequence_key(next_day, "01"));
        assert_eq!(layaway_sequence_key(day()), "layaway:20260105");
    }
}
