//! Record sink trait and output errors

use crate::catalog::ProductRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for product records produced by a crawl
///
/// Records arrive one at a time in crawl order: page by page, and in block
/// order within a page.
pub trait RecordSink {
    /// Accepts one record
    fn accept(&mut self, record: ProductRecord) -> OutputResult<()>;

    /// Flushes buffered output once the crawl is over
    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

impl RecordSink for Vec<ProductRecord> {
    fn accept(&mut self, record: ProductRecord) -> OutputResult<()> {
        self.push(record);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn accept(&mut self, record: ProductRecord) -> OutputResult<()> {
        (**self).accept(record)
    }

    fn finish(&mut self) -> OutputResult<()> {
        (**self).finish()
    }
}
