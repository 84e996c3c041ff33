//! Instrument statistics runner
//!
//! Reads the price file in chunks, adjusts values by the per-instrument
//! multiplier from SQLite and prints one summary line per instrument.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin instrument_stats -- --input instrument_prices.txt --db instrument_data.db
//! ```
//!
//! See `instrument_stats::config` for the environment variables. Logs go to
//! stderr (RUST_LOG, default: info); the report goes to stdout.

use instrument_stats::config::PipelineConfig;
use instrument_stats::pipeline;
use instrument_stats::report;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let config = PipelineConfig::from_env()?.with_cli_args(&args)?;

    log::info!("🚀 Starting instrument statistics run");
    config.log_summary();

    let summary = match pipeline::run(&config).await {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("❌ Run aborted: {}", e);
            return Err(e.into());
        }
    };

    let stdout = std::io::stdout();
    report::write_report(&summary.aggregated, config.output_format, stdout.lock())?;

    log::info!(
        "✅ Reported {} instruments over {} chunks",
        summary.aggregated.instrument_count(),
        summary.chunks
    );

    Ok(())
}
