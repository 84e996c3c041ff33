//! Run configuration from environment variables and CLI flags
//!
//! Environment variables (a `.env` file is honoured by the binaries):
//! - `INSTRUMENT_INPUT_PATH` (default: instrument_prices.txt)
//! - `INSTRUMENT_DB_PATH` (default: instrument_data.db)
//! - `CHUNK_SIZE` (default: 10000)
//! - `CUTOFF_DATE` (default: 19-Dec-2014)
//! - `BUSINESS_DAYS` (default: Mon,Tue,Wed,Thu,Fri)
//! - `WORKER_COUNT` (default: available parallelism)
//! - `SKIP_MALFORMED_LINES` (default: false)
//! - `OUTPUT_FORMAT` (default: text; or json)
//!
//! CLI flags `--input`, `--db`, `--chunk-size` and `--format` override the
//! environment.

use crate::pipeline::partition::{ParsePolicy, DATE_FORMAT};
use crate::report::OutputFormat;
use chrono::{NaiveDate, Weekday};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_CUTOFF_DATE: &str = "19-Dec-2014";
pub const DEFAULT_BUSINESS_DAYS: &str = "Mon,Tue,Wed,Thu,Fri";

#[derive(Debug)]
pub enum ConfigError {
    MissingValue(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingValue(flag) => write!(f, "Missing value for {}", flag),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Instrument price file
    pub input_path: PathBuf,

    /// SQLite database holding INSTRUMENT_PRICE_MODIFIER
    pub db_path: PathBuf,

    /// Lines per chunk
    pub chunk_size: usize,

    /// Latest date whose records are processed
    pub cutoff_date: NaiveDate,

    /// Weekdays whose records are processed
    pub business_days: Vec<Weekday>,

    /// Size of the instrument worker pool
    pub worker_count: usize,

    pub parse_policy: ParsePolicy,

    pub output_format: OutputFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("instrument_prices.txt"),
            db_path: PathBuf::from("instrument_data.db"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cutoff_date: NaiveDate::from_ymd_opt(2014, 12, 19).unwrap_or_default(),
            business_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            worker_count: default_worker_count(),
            parse_policy: ParsePolicy::FailFast,
            output_format: OutputFormat::Text,
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_positive(name: &str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        ConfigError::InvalidValue(format!("{} must look like 19-Dec-2014, got '{}'", name, raw))
    })
}

fn parse_business_days(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    let mut days = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let day = token.parse::<Weekday>().map_err(|_| {
            ConfigError::InvalidValue(format!("BUSINESS_DAYS has unknown weekday '{}'", token))
        })?;
        if !days.contains(&day) {
            days.push(day);
        }
    }

    if days.is_empty() {
        return Err(ConfigError::InvalidValue(
            "BUSINESS_DAYS must name at least one weekday".to_string(),
        ));
    }
    Ok(days)
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    raw.trim()
        .to_lowercase()
        .parse::<bool>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be true or false, got '{}'", name, raw)))
}

impl PipelineConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("INSTRUMENT_INPUT_PATH") {
            config.input_path = path.into();
        }
        if let Some(path) = lookup("INSTRUMENT_DB_PATH") {
            config.db_path = path.into();
        }
        if let Some(raw) = lookup("CHUNK_SIZE") {
            config.chunk_size = parse_positive("CHUNK_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("CUTOFF_DATE") {
            config.cutoff_date = parse_date("CUTOFF_DATE", &raw)?;
        }
        if let Some(raw) = lookup("BUSINESS_DAYS") {
            config.business_days = parse_business_days(&raw)?;
        }
        if let Some(raw) = lookup("WORKER_COUNT") {
            config.worker_count = parse_positive("WORKER_COUNT", &raw)?;
        }
        if let Some(raw) = lookup("SKIP_MALFORMED_LINES") {
            if parse_bool("SKIP_MALFORMED_LINES", &raw)? {
                config.parse_policy = ParsePolicy::SkipAndLog;
            }
        }
        if let Some(raw) = lookup("OUTPUT_FORMAT") {
            config.output_format = OutputFormat::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(format!("OUTPUT_FORMAT must be text or json, got '{}'", raw))
            })?;
        }

        Ok(config)
    }

    /// Apply `--input`, `--db`, `--chunk-size` and `--format` overrides
    ///
    /// `args` is the full argv including the program name. Unknown arguments
    /// are ignored.
    pub fn with_cli_args(mut self, args: &[String]) -> Result<Self, ConfigError> {
        let mut iter = args.iter().skip(1);

        while let Some(arg) = iter.next() {
            let mut value_for = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
            };

            match arg.as_str() {
                "--input" => self.input_path = value_for("--input")?.into(),
                "--db" => self.db_path = value_for("--db")?.into(),
                "--chunk-size" => {
                    self.chunk_size = parse_positive("--chunk-size", &value_for("--chunk-size")?)?
                }
                "--format" => {
                    let raw = value_for("--format")?;
                    self.output_format = OutputFormat::parse(&raw).ok_or_else(|| {
                        ConfigError::InvalidValue(format!("--format must be text or json, got '{}'", raw))
                    })?;
                }
                other => log::debug!("Ignoring unknown argument: {}", other),
            }
        }

        Ok(self)
    }

    pub fn log_summary(&self) {
        log::info!("📊 Configuration:");
        log::info!("   Input: {}", self.input_path.display());
        log::info!("   Database: {}", self.db_path.display());
        log::info!("   Chunk size: {} lines", self.chunk_size);
        log::info!("   Cutoff date: {}", self.cutoff_date.format(DATE_FORMAT));
        log::info!("   Business days: {:?}", self.business_days);
        log::info!("   Workers: {}", self.worker_count);
        log::info!("   Parse policy: {:?}", self.parse_policy);
    }
}
