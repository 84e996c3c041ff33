//! Report rendering for aggregated instrument results
//!
//! Text lines look like `INSTRUMENT1 (Mean): [50.00, 60.00]`; a chunk whose
//! statistic had no input is shown as `n/a`. The JSON form carries the same
//! data with `null` for absent results.

use crate::pipeline::aggregator::AggregatedResult;
use crate::pipeline::strategy::Strategy;
use serde::Serialize;
use std::io::Write;

/// Placeholder for an absent per-chunk result
pub const MISSING_RESULT: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InstrumentReport<'a> {
    pub instrument: &'a str,
    pub calculation: String,
    pub results: &'a [Option<f64>],
}

/// Format one instrument's line of the text report
pub fn format_line(instrument: &str, results: &[Option<f64>]) -> String {
    let label = Strategy::for_instrument(instrument).label();
    let rendered: Vec<String> = results
        .iter()
        .map(|r| match r {
            Some(value) => format!("{:.2}", value),
            None => MISSING_RESULT.to_string(),
        })
        .collect();

    format!("{} ({}): [{}]", instrument, label, rendered.join(", "))
}

pub fn instrument_reports(aggregated: &AggregatedResult) -> Vec<InstrumentReport<'_>> {
    aggregated
        .iter()
        .map(|(instrument, results)| InstrumentReport {
            instrument,
            calculation: Strategy::for_instrument(instrument).label(),
            results,
        })
        .collect()
}

/// Write the whole report, one instrument per line in first-seen order
pub fn write_report<W: Write>(
    aggregated: &AggregatedResult,
    format: OutputFormat,
    mut out: W,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => {
            for (instrument, results) in aggregated.iter() {
                writeln!(out, "{}", format_line(instrument, results))?;
            }
        }
        OutputFormat::Json => {
            for report in instrument_reports(aggregated) {
                let json = serde_json::to_string(&report)?;
                writeln!(out, "{}", json)?;
            }
        }
    }

    out.flush()
}
