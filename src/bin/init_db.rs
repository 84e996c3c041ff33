//! Modifier store bootstrap
//!
//! Creates INSTRUMENT_PRICE_MODIFIER if missing and optionally inserts
//! multipliers given as `NAME=MULTIPLIER` arguments.
//!
//! ```bash
//! cargo run --bin init_db -- INSTRUMENT1=1.05 INSTRUMENT3=0.98
//! ```
//!
//! - INSTRUMENT_DB_PATH - database path (default: instrument_data.db)

use instrument_stats::config::{ConfigError, PipelineConfig};
use instrument_stats::store::SqliteMultiplierStore;
use std::env;

fn parse_seed(arg: &str) -> Result<(String, f64), ConfigError> {
    let (name, raw) = arg.split_once('=').ok_or_else(|| {
        ConfigError::InvalidValue(format!("expected NAME=MULTIPLIER, got '{}'", arg))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidValue(format!("empty instrument name in '{}'", arg)));
    }

    let multiplier = raw.trim().parse::<f64>().map_err(|_| {
        ConfigError::InvalidValue(format!("invalid multiplier '{}' for {}", raw, name))
    })?;

    Ok((name.to_string(), multiplier))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = PipelineConfig::from_env()?;
    let seeds = env::args()
        .skip(1)
        .map(|arg| parse_seed(&arg))
        .collect::<Result<Vec<_>, _>>()?;

    let store = SqliteMultiplierStore::open(&config.db_path)?;
    store.init_schema()?;
    log::info!("✅ Schema ready: {}", config.db_path.display());

    for (name, multiplier) in seeds {
        let id = store.insert(&name, multiplier)?;
        log::info!("   ├─ {} = {} (id={})", name, multiplier, id);
    }

    Ok(())
}
