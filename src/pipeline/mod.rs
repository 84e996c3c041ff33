//! # Chunked instrument aggregation pipeline
//!
//! Processes one finite price file to completion:
//!
//! 1. [`reader`] - bounded line batches, single forward pass
//! 2. [`partition`] - parse, cutoff/business-day filter, group per instrument
//! 3. [`dispatcher`] - per-instrument work across a worker pool, one chunk at a time
//! 4. [`cache`] - per-worker multiplier cache (5s TTL) in front of the store
//! 5. [`strategy`] - multiplier adjustment and the instrument's statistic
//! 6. [`aggregator`] - per-instrument result sequences in chunk order
//!
//! [`engine`] drives the loop. Chunks are strictly sequential; only the
//! instruments inside one chunk are computed concurrently.

pub mod aggregator;
pub mod cache;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod partition;
pub mod reader;
pub mod strategy;

// Re-export commonly used types
pub use aggregator::{AggregatedResult, ChunkResult};
pub use cache::{CacheStats, MultiplierCache, CACHE_TTL};
pub use dispatcher::ChunkDispatcher;
pub use engine::{run, PipelineEngine, RunSummary};
pub use error::PipelineError;
pub use partition::{InstrumentGroup, ParseError, ParsePolicy, Record, RecordPartitioner};
pub use reader::{Chunk, ChunkReader};
pub use strategy::{process, Strategy, DEFAULT_MULTIPLIER};
