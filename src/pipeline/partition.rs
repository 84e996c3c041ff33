//! Line parsing and per-instrument grouping for one chunk
//!
//! Input lines look like `INSTRUMENT1,19-Dec-2014,101.25`. Records after the
//! cutoff date or outside the business-day set are dropped; the rest are
//! grouped by instrument in first-seen order, each group newest-first.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;

/// Date format of the input file, e.g. `19-Dec-2014`
pub const DATE_FORMAT: &str = "%d-%b-%Y";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentGroup {
    pub key: String,
    /// Sorted by date descending
    pub records: Vec<Record>,
}

/// What to do with a line that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Abort the run on the first malformed line
    #[default]
    FailFast,
    /// Log the line, count it and keep going
    SkipAndLog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    FieldCount(usize),
    InvalidDate(String),
    InvalidValue(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// 1-based line number within the source file
    pub line_number: usize,
    pub kind: ParseErrorKind,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParseErrorKind::FieldCount(n) => write!(
                f,
                "line {}: expected 3 comma-separated fields, got {}",
                self.line_number, n
            ),
            ParseErrorKind::InvalidDate(d) => {
                write!(f, "line {}: invalid date '{}'", self.line_number, d)
            }
            ParseErrorKind::InvalidValue(v) => {
                write!(f, "line {}: invalid value '{}'", self.line_number, v)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one line into `(key, record)`
///
/// Fields are trimmed; `line_number` is only used for error reporting.
pub fn parse_line(line: &str, line_number: usize) -> Result<(String, Record), ParseError> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();

    if fields.len() != 3 {
        return Err(ParseError {
            line_number,
            kind: ParseErrorKind::FieldCount(fields.len()),
        });
    }

    let date = NaiveDate::parse_from_str(fields[1], DATE_FORMAT).map_err(|_| ParseError {
        line_number,
        kind: ParseErrorKind::InvalidDate(fields[1].to_string()),
    })?;

    let value = fields[2].parse::<f64>().map_err(|_| ParseError {
        line_number,
        kind: ParseErrorKind::InvalidValue(fields[2].to_string()),
    })?;

    Ok((fields[0].to_string(), Record { date, value }))
}

/// Groups of one chunk plus line accounting for the run summary
#[derive(Debug, Default)]
pub struct Partition {
    pub groups: Vec<InstrumentGroup>,
    pub retained: usize,
    pub filtered_out: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct RecordPartitioner {
    cutoff_date: NaiveDate,
    business_days: Vec<Weekday>,
    policy: ParsePolicy,
}

impl RecordPartitioner {
    pub fn new(cutoff_date: NaiveDate, business_days: Vec<Weekday>, policy: ParsePolicy) -> Self {
        Self {
            cutoff_date,
            business_days,
            policy,
        }
    }

    /// Whether a record is eligible for processing
    pub fn admits(&self, date: NaiveDate) -> bool {
        date <= self.cutoff_date && self.business_days.contains(&date.weekday())
    }

    /// Parse, filter and group the lines of one chunk
    ///
    /// `first_line_number` is the 1-based file line number of `lines[0]`.
    /// Blank lines carry no record and are ignored.
    pub fn partition(
        &self,
        lines: &[String],
        first_line_number: usize,
    ) -> Result<Partition, ParseError> {
        let mut order: Vec<String> = Vec::new();
        let mut by_key: HashMap<String, Vec<Record>> = HashMap::new();
        let mut partition = Partition::default();

        for (offset, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (key, record) = match parse_line(line, first_line_number + offset) {
                Ok(parsed) => parsed,
                Err(e) => match self.policy {
                    ParsePolicy::FailFast => return Err(e),
                    ParsePolicy::SkipAndLog => {
                        log::warn!("⚠️  Skipping malformed {}", e);
                        partition.skipped += 1;
                        continue;
                    }
                },
            };

            if !self.admits(record.date) {
                partition.filtered_out += 1;
                continue;
            }

            partition.retained += 1;
            by_key
                .entry(key)
                .or_insert_with_key(|k| {
                    order.push(k.clone());
                    Vec::new()
                })
                .push(record);
        }

        partition.groups = order
            .into_iter()
            .filter_map(|key| {
                let mut records = by_key.remove(&key)?;
                records.sort_by(|a, b| b.date.cmp(&a.date));
                Some(InstrumentGroup { key, records })
            })
            .collect();

        Ok(partition)
    }
}
