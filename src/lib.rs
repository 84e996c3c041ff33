pub mod config;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod store;
