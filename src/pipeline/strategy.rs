//! Per-instrument statistic selection and evaluation
//!
//! Instrument keys map to a [`Strategy`] through a static table; keys not in
//! the table fall back to summing the newest ten values.

use super::partition::Record;
use crate::stats;
use chrono::{Datelike, Month};

/// Applied when the store has no multiplier for an instrument
pub const DEFAULT_MULTIPLIER: f64 = 1.0;

/// Number of newest records summed by the fallback strategy
pub const NEWEST_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    Mean,
    /// Mean over records dated within one calendar month
    MeanInMonth { year: i32, month: Month },
    Median,
    /// Sum over the first `n` records of a newest-first group
    SumNewest(usize),
}

const STRATEGY_TABLE: &[(&str, Strategy)] = &[
    ("INSTRUMENT1", Strategy::Mean),
    (
        "INSTRUMENT2",
        Strategy::MeanInMonth {
            year: 2014,
            month: Month::November,
        },
    ),
    ("INSTRUMENT3", Strategy::Median),
];

const FALLBACK_STRATEGY: Strategy = Strategy::SumNewest(NEWEST_COUNT);

impl Strategy {
    /// Resolve the strategy for an instrument key (exact match)
    pub fn for_instrument(key: &str) -> Self {
        STRATEGY_TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, strategy)| *strategy)
            .unwrap_or(FALLBACK_STRATEGY)
    }

    /// Human-readable calculation name used in the report
    pub fn label(&self) -> String {
        match self {
            Strategy::Mean => "Mean".to_string(),
            Strategy::MeanInMonth { year, month } => {
                format!("Mean for {} {}", month.name(), year)
            }
            Strategy::Median => "Median".to_string(),
            Strategy::SumNewest(n) => format!("Sum of the newest {} elements", n),
        }
    }

    /// Evaluate over `records` (newest-first) after scaling by `multiplier`
    ///
    /// `None` when the statistic has no input (mean/median of nothing).
    pub fn apply(&self, records: &[Record], multiplier: f64) -> Option<f64> {
        let adjusted = records.iter().map(|r| (r, r.value * multiplier));

        match self {
            Strategy::Mean => stats::mean(&adjusted.map(|(_, v)| v).collect::<Vec<_>>()),
            Strategy::MeanInMonth { year, month } => {
                let values: Vec<f64> = adjusted
                    .filter(|(r, _)| {
                        r.date.year() == *year && r.date.month() == month.number_from_month()
                    })
                    .map(|(_, v)| v)
                    .collect();
                stats::mean(&values)
            }
            Strategy::Median => stats::median(&adjusted.map(|(_, v)| v).collect::<Vec<_>>()),
            Strategy::SumNewest(n) => {
                let newest: Vec<f64> = adjusted.take(*n).map(|(_, v)| v).collect();
                Some(stats::sum_newest(&newest, *n))
            }
        }
    }
}

/// Compute one instrument's statistic from its newest-first records
pub fn process(key: &str, records: &[Record], multiplier: f64) -> Option<f64> {
    Strategy::for_instrument(key).apply(records, multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(y: i32, m: u32, d: u32, value: f64) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            value,
        }
    }

    #[test]
    fn test_strategy_table() {
        assert_eq!(Strategy::for_instrument("INSTRUMENT1"), Strategy::Mean);
        assert_eq!(
            Strategy::for_instrument("INSTRUMENT2"),
            Strategy::MeanInMonth {
                year: 2014,
                month: Month::November
            }
        );
        assert_eq!(Strategy::for_instrument("INSTRUMENT3"), Strategy::Median);
        assert_eq!(Strategy::for_instrument("INSTRUMENT4"), Strategy::SumNewest(10));
        assert_eq!(Strategy::for_instrument("instrument1"), Strategy::SumNewest(10));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Strategy::for_instrument("INSTRUMENT1").label(), "Mean");
        assert_eq!(
            Strategy::for_instrument("INSTRUMENT2").label(),
            "Mean for November 2014"
        );
        assert_eq!(Strategy::for_instrument("INSTRUMENT3").label(), "Median");
        assert_eq!(
            Strategy::for_instrument("ANYTHING").label(),
            "Sum of the newest 10 elements"
        );
    }

    #[test]
    fn test_mean_applies_multiplier() {
        let records = vec![record(2014, 12, 3, 10.0), record(2014, 12, 2, 20.0)];
        assert_eq!(process("INSTRUMENT1", &records, 2.0), Some(30.0));
        assert_eq!(process("INSTRUMENT1", &records, DEFAULT_MULTIPLIER), Some(15.0));
    }

    #[test]
    fn test_mean_in_november() {
        let records = vec![
            record(2014, 12, 1, 1000.0),
            record(2014, 11, 28, 4.0),
            record(2014, 11, 3, 2.0),
            record(2013, 11, 4, 500.0),
            record(2014, 10, 31, 700.0),
        ];
        assert_eq!(process("INSTRUMENT2", &records, 1.5), Some(4.5));
    }

    #[test]
    fn test_mean_in_november_without_november_records_is_absent() {
        let records = vec![record(2014, 12, 1, 1.0)];
        assert_eq!(process("INSTRUMENT2", &records, 1.0), None);
    }

    #[test]
    fn test_median() {
        let records = vec![
            record(2014, 12, 4, 3.0),
            record(2014, 12, 3, 1.0),
            record(2014, 12, 2, 4.0),
            record(2014, 12, 1, 2.0),
        ];
        assert_eq!(process("INSTRUMENT3", &records, 1.0), Some(2.5));
        assert_eq!(process("INSTRUMENT3", &[], 1.0), None);
    }

    #[test]
    fn test_sum_newest_uses_first_ten_records() {
        // Newest-first; the oldest two carry large values that must be excluded
        let mut records: Vec<Record> = (0..10).map(|i| record(2014, 12, 19 - i, 1.0)).collect();
        records.push(record(2014, 12, 5, 1000.0));
        records.push(record(2014, 12, 4, 1000.0));

        assert_eq!(process("INSTRUMENT9", &records, 1.0), Some(10.0));
        assert_eq!(process("INSTRUMENT9", &records, 0.5), Some(5.0));
    }

    #[test]
    fn test_sum_newest_with_fewer_records() {
        let records = vec![record(2014, 12, 2, 1.5), record(2014, 12, 1, 2.5)];
        assert_eq!(process("OTHER", &records, 2.0), Some(8.0));
    }
}
