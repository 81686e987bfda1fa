//! Purpose: Immutable per-run configuration for the two export pipelines.
//! Exports: `TimeDiffConfig`, `ExportConfig`.
//! Role: Built once from parsed flags, validated, then passed by reference.
//! Invariants: A config that exists has a validated height range and a non-empty endpoint.
use std::path::PathBuf;

use crate::core::error::{Error, ErrorKind};
use crate::core::range::HeightRange;
use crate::sink::{TIME_DIFF_FILE_NAME, block_export_file_name};
use crate::source::StoreOptions;

#[derive(Clone, Debug)]
pub struct TimeDiffConfig {
    pub range: HeightRange,
    pub url: String,
    pub out_dir: PathBuf,
}

impl TimeDiffConfig {
    pub fn new(
        start: u64,
        end: u64,
        url: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let url = require_endpoint(url.into())?;
        let range = HeightRange::new(start, end)?;
        Ok(Self {
            range,
            url,
            out_dir: out_dir.into(),
        })
    }

    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(TIME_DIFF_FILE_NAME)
    }
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub range: HeightRange,
    pub store: StoreOptions,
    pub out_dir: PathBuf,
}

impl ExportConfig {
    pub fn new(
        start: u64,
        end: u64,
        store: StoreOptions,
        out_dir: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let url = require_endpoint(store.url)?;
        let range = HeightRange::new(start, end)?;
        Ok(Self {
            range,
            store: StoreOptions { url, ..store },
            out_dir: out_dir.into(),
        })
    }

    /// Output path named after the requested start and the highest height actually seen.
    pub fn output_path(&self, max_observed_height: u64) -> PathBuf {
        self.out_dir
            .join(block_export_file_name(self.range.start(), max_observed_height))
    }
}

fn require_endpoint(url: String) -> Result<String, Error> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("missing required flags")
            .with_hint("--url must name the endpoint to read from"));
    }
    Ok(trimmed.to_string())
}
