//! Pipeline engine - sequential chunk driver
//!
//! ```text
//! ChunkReader::next_chunk()
//!     ↓
//! RecordPartitioner::partition()   (parse, cutoff + business-day filter, group)
//!     ↓
//! ChunkDispatcher::dispatch_chunk() (parallel per instrument, barrier)
//!     ↓
//! AggregatedResult::append()       (strictly in chunk order)
//! ```
//!
//! Only the per-instrument work inside one chunk runs in parallel. The next
//! chunk is not partitioned until the previous one has been appended, which is
//! what keeps every instrument's result sequence in file order.

use super::aggregator::AggregatedResult;
use super::cache::CacheStats;
use super::dispatcher::ChunkDispatcher;
use super::error::PipelineError;
use super::partition::RecordPartitioner;
use super::reader::ChunkReader;
use crate::config::PipelineConfig;
use crate::store::SqliteMultiplierStore;
use std::time::Instant;

/// Outcome of a complete run
#[derive(Debug)]
pub struct RunSummary {
    pub aggregated: AggregatedResult,
    pub chunks: usize,
    pub lines: usize,
    pub retained: usize,
    pub filtered_out: usize,
    pub skipped: usize,
    pub cache: CacheStats,
}

pub struct PipelineEngine {
    partitioner: RecordPartitioner,
    dispatcher: ChunkDispatcher,
}

impl PipelineEngine {
    /// Bootstrap the store and start the worker pool
    ///
    /// The store schema is ensured once through a read-write connection; each
    /// worker then opens its own read-only connection. Failure here is fatal.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        SqliteMultiplierStore::open(&config.db_path)?.init_schema()?;

        let db_path = config.db_path.clone();
        let dispatcher = ChunkDispatcher::spawn(config.worker_count, |_| {
            SqliteMultiplierStore::open_read_only(&db_path)
        })?;

        Ok(Self::with_dispatcher(config, dispatcher))
    }

    /// Build around an existing dispatcher (any store implementation)
    pub fn with_dispatcher(config: &PipelineConfig, dispatcher: ChunkDispatcher) -> Self {
        Self {
            partitioner: RecordPartitioner::new(
                config.cutoff_date,
                config.business_days.clone(),
                config.parse_policy,
            ),
            dispatcher,
        }
    }

    /// Process `reader` to the end, then stop the workers
    ///
    /// Fails fast: the first I/O, parse or worker error aborts the run and no
    /// result is returned for any chunk.
    pub async fn run(self, mut reader: ChunkReader) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let mut aggregated = AggregatedResult::new();
        let mut chunks = 0;
        let mut lines = 0;
        let mut retained = 0;
        let mut filtered_out = 0;
        let mut skipped = 0;

        while let Some(chunk) = reader.next_chunk().await? {
            let chunk_started = Instant::now();
            let partition = self.partitioner.partition(&chunk.lines, chunk.first_line)?;
            let group_count = partition.groups.len();

            let chunk_result = self.dispatcher.dispatch_chunk(partition.groups).await?;
            aggregated.append(chunk_result);

            chunks += 1;
            lines += chunk.lines.len();
            retained += partition.retained;
            filtered_out += partition.filtered_out;
            skipped += partition.skipped;

            log::debug!(
                "✅ Chunk {}: {} lines, {} instruments | {}ms",
                chunk.index,
                chunk.lines.len(),
                group_count,
                chunk_started.elapsed().as_millis()
            );
        }

        let cache = self.dispatcher.shutdown().await?;

        log::info!(
            "✅ Processed {} chunks ({} lines, {} records kept, {} filtered, {} skipped) in {}ms",
            chunks,
            lines,
            retained,
            filtered_out,
            skipped,
            started.elapsed().as_millis()
        );
        log::info!(
            "   └─ Multiplier cache: {} hits, {} misses, {} store errors",
            cache.hits,
            cache.misses,
            cache.store_errors
        );

        Ok(RunSummary {
            aggregated,
            chunks,
            lines,
            retained,
            filtered_out,
            skipped,
            cache,
        })
    }
}

/// Run the whole pipeline described by `config`
pub async fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let engine = PipelineEngine::new(config)?;
    let reader = ChunkReader::open(&config.input_path, config.chunk_size).await?;
    engine.run(reader).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::partition::ParsePolicy;
    use crate::store::{MultiplierStore, StoreError};
    use std::path::Path;
    use tokio::io::AsyncWriteExt;

    struct NoMultipliers;

    impl MultiplierStore for NoMultipliers {
        fn lookup(&self, _name: &str) -> Result<Option<f64>, StoreError> {
            Ok(None)
        }
    }

    async fn write_file(path: &Path, lines: &[&str]) {
        let mut file = tokio::fs::File::create(path).await.unwrap();
        for line in lines {
            file.write_all(line.as_bytes()).await.unwrap();
            file.write_all(b"\n").await.unwrap();
        }
        file.flush().await.unwrap();
    }

    fn config(chunk_size: usize, policy: ParsePolicy) -> PipelineConfig {
        PipelineConfig {
            chunk_size,
            worker_count: 2,
            parse_policy: policy,
            ..PipelineConfig::default()
        }
    }

    async fn run_lines(
        lines: &[&str],
        config: &PipelineConfig,
    ) -> Result<RunSummary, PipelineError> {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("prices.txt");
        write_file(&input, lines).await;

        let dispatcher = ChunkDispatcher::spawn(config.worker_count, |_| Ok(NoMultipliers)).unwrap();
        let engine = PipelineEngine::with_dispatcher(config, dispatcher);
        let reader = ChunkReader::open(&input, config.chunk_size).await.unwrap();
        engine.run(reader).await
    }

    #[tokio::test]
    async fn test_two_chunks_keep_order() {
        let summary = run_lines(
            &[
                "INSTRUMENT1,01-Dec-2014,40.0",
                "INSTRUMENT1,02-Dec-2014,60.0",
                "INSTRUMENT1,03-Dec-2014,50.0",
                "INSTRUMENT1,04-Dec-2014,70.0",
            ],
            &config(2, ParsePolicy::FailFast),
        )
        .await
        .unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.lines, 4);
        assert_eq!(
            summary.aggregated.get("INSTRUMENT1").unwrap(),
            &[Some(50.0), Some(60.0)]
        );
    }

    #[tokio::test]
    async fn test_counts_filtered_and_skipped_lines() {
        let summary = run_lines(
            &[
                "INSTRUMENT1,01-Dec-2014,1.0",
                "INSTRUMENT1,06-Dec-2014,1.0", // Saturday
                "broken line",
                "INSTRUMENT1,05-Jan-2015,1.0", // after cutoff
            ],
            &config(10, ParsePolicy::SkipAndLog),
        )
        .await
        .unwrap();

        assert_eq!(summary.retained, 1);
        assert_eq!(summary.filtered_out, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_parse_error_aborts_run() {
        let result = run_lines(
            &["INSTRUMENT1,01-Dec-2014,1.0", "INSTRUMENT1,01-Dec-2014"],
            &config(10, ParsePolicy::FailFast),
        )
        .await;

        match result {
            Err(PipelineError::Parse(e)) => assert_eq!(e.line_number, 2),
            other => panic!("expected parse error, got {:?}", other.map(|s| s.chunks)),
        }
    }

    #[tokio::test]
    async fn test_instrument_only_in_later_chunk() {
        let summary = run_lines(
            &[
                "INSTRUMENT1,01-Dec-2014,1.0",
                "INSTRUMENT3,01-Dec-2014,5.0",
                "INSTRUMENT1,02-Dec-2014,3.0",
            ],
            &config(1, ParsePolicy::FailFast),
        )
        .await
        .unwrap();

        assert_eq!(summary.aggregated.get("INSTRUMENT1").unwrap(), &[Some(1.0), Some(3.0)]);
        assert_eq!(summary.aggregated.get("INSTRUMENT3").unwrap(), &[Some(5.0)]);

        let keys: Vec<&str> = summary.aggregated.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["INSTRUMENT1", "INSTRUMENT3"]);
    }
}
