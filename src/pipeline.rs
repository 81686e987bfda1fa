//! Purpose: Drive the two export pipelines end to end.
//! Exports: `run_time_diff`, `run_block_export`, `TimeDiffOutcome`, `ExportOutcome`.
//! Role: Wires range, record source, transformer, and CSV sink in one linear pass.
//! Invariants: Timestamp diffs skip a height whose own or predecessor fetch fails.
//! Invariants: Block export aborts on the first cursor, decode, or write failure.
//! Invariants: Rows are written in source order (ascending height).
use std::path::PathBuf;

use crate::config::{ExportConfig, TimeDiffConfig};
use crate::core::error::Error;
use crate::sink::{BLOCK_EXPORT_HEADER, CsvSink, TIME_DIFF_HEADER};
use crate::source::{BlockDocument, BlockSource, DocumentStore};
use crate::transform::{DocumentRow, time_diff};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeDiffOutcome {
    pub path: PathBuf,
    pub rows: u64,
    pub skipped: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub rows: u64,
    pub max_observed_height: u64,
}

/// Writes one `(height, seconds since previous block)` row per height in the range.
///
/// Both `i` and `i - 1` are fetched for every `i`, so interior heights are
/// requested twice. A failed lookup is logged and that height produces no row.
pub fn run_time_diff<S>(config: &TimeDiffConfig, source: &S) -> Result<TimeDiffOutcome, Error>
where
    S: BlockSource + ?Sized,
{
    let mut sink = CsvSink::create(config.output_path(), &TIME_DIFF_HEADER)?;
    let mut skipped = 0u64;

    for height in config.range.heights() {
        let current = match source.fetch_block(height) {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!("Error retrieving block {height}: {err}");
                skipped += 1;
                continue;
            }
        };
        let previous = match source.fetch_block(height - 1) {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!("Error retrieving block {}: {err}", height - 1);
                skipped += 1;
                continue;
            }
        };

        let row = time_diff(height, &current, &previous);
        let [height_field, diff_field] = row.fields();
        tracing::info!(
            "Between block {height} and {}: {diff_field} (s)",
            height - 1
        );
        sink.write_row([height_field, diff_field])?;
    }

    let rows = sink.rows();
    let path = sink.path().to_path_buf();
    sink.finish()?;
    tracing::info!("Created csv file: {}", path.display());
    Ok(TimeDiffOutcome {
        path,
        rows,
        skipped,
    })
}

/// Exports every stored block in the range, named after the highest height found.
pub fn run_block_export<S>(config: &ExportConfig, store: &S) -> Result<ExportOutcome, Error>
where
    S: DocumentStore + ?Sized,
{
    let cursor = store.blocks_in(config.range)?;
    let (blocks, max_observed_height) = collect_blocks(cursor)?;
    if blocks.is_empty() {
        tracing::warn!("no stored blocks matched heights {}", config.range);
    }

    let path = config.output_path(max_observed_height);
    let mut sink = CsvSink::create(&path, &BLOCK_EXPORT_HEADER)?;
    for block in &blocks {
        sink.write_row(DocumentRow::from(block).fields())?;
    }
    let rows = sink.rows();
    sink.finish()?;

    tracing::info!("Data saved: {}", path.display());
    Ok(ExportOutcome {
        path,
        rows,
        max_observed_height,
    })
}

fn collect_blocks<I>(cursor: I) -> Result<(Vec<BlockDocument>, u64), Error>
where
    I: IntoIterator<Item = Result<BlockDocument, Error>>,
{
    let mut blocks = Vec::new();
    let mut max_observed_height = 0u64;
    for item in cursor {
        let block = item?;
        tracing::info!("Fetching blocks for height {}...", block.height);
        max_observed_height = max_observed_height.max(block.height);
        blocks.push(block);
    }
    Ok((blocks, max_observed_height))
}
