//! Purpose: Serialize transformed rows to a CSV file with a fixed header.
//! Exports: `CsvSink`, `TIME_DIFF_HEADER`, `BLOCK_EXPORT_HEADER`, output file naming helpers.
//! Role: Final stage of both export pipelines.
//! Invariants: Exactly one header row precedes data rows; rows keep arrival order.
//! Invariants: The target is created or truncated; partial output is left on failure.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::core::error::{Error, ErrorKind};

pub const TIME_DIFF_HEADER: [&str; 2] = ["Height", "Time Diff (Seconds)"];
pub const BLOCK_EXPORT_HEADER: [&str; 3] = ["Height", "NumTransactions", "BlockSize (bytes)"];

pub const TIME_DIFF_FILE_NAME: &str = "block_timestamp_diff.csv";

pub fn block_export_file_name(start: u64, max_observed_height: u64) -> String {
    format!("blocks-{start}-{max_observed_height}.csv")
}

pub struct CsvSink<W: Write> {
    writer: Writer<W>,
    path: PathBuf,
    rows: u64,
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, header: &[&str]) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create CSV file")
                .with_path(&path)
                .with_source(err)
        })?;
        Self::from_writer(BufWriter::new(file), path, header)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W, path: PathBuf, header: &[&str]) -> Result<Self, Error> {
        let mut sink = Self {
            writer: Writer::from_writer(inner),
            path,
            rows: 0,
        };
        sink.writer.write_record(header).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write CSV header")
                .with_path(&sink.path)
                .with_source(err)
        })?;
        Ok(sink)
    }

    pub fn write_row<I, F>(&mut self, fields: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        self.writer.write_record(fields).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write CSV record")
                .with_path(&self.path)
                .with_source(err)
        })?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered rows and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, Error> {
        self.writer.flush().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to flush CSV file")
                .with_path(&self.path)
                .with_source(err)
        })?;
        let path = self.path;
        self.writer.into_inner().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to flush CSV file: {}", err.error()))
                .with_path(path)
        })
    }
}
