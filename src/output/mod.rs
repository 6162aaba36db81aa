//! Output module for crawl records and watch reports
//!
//! This module handles:
//! - Streaming product records to JSON-lines files or stdout
//! - Recording and printing watch statistics

mod jsonl;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, RecordSink};
