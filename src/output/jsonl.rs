//! JSON-lines record export

use crate::catalog::ProductRecord;
use crate::output::traits::{OutputResult, RecordSink};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes every record as one JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Creates (or truncates) a JSON-lines file
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn accept(&mut self, record: ProductRecord) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
