//! Purpose: Map fetched records onto CSV output rows.
//! Exports: `TimeDiffRow`, `DocumentRow`, `time_diff`.
//! Role: Stateless transformer between record sources and the CSV sink.
//! Invariants: Time diffs keep their sign; non-monotonic timestamps are surfaced as-is.
//! Invariants: Document rows copy fields verbatim.
use crate::source::{BlockDocument, BlockRecord};

#[derive(Clone, Debug, PartialEq)]
pub struct TimeDiffRow {
    pub height: u64,
    pub diff_seconds: f64,
}

impl TimeDiffRow {
    pub fn fields(&self) -> [String; 2] {
        [self.height.to_string(), format!("{:.2}", self.diff_seconds)]
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DocumentRow {
    pub height: u64,
    pub transaction_count: u64,
    pub raw_byte_size: usize,
}

impl DocumentRow {
    pub fn fields(&self) -> [String; 3] {
        [
            self.height.to_string(),
            self.transaction_count.to_string(),
            self.raw_byte_size.to_string(),
        ]
    }
}

impl From<&BlockDocument> for DocumentRow {
    fn from(block: &BlockDocument) -> Self {
        Self {
            height: block.height,
            transaction_count: block.transaction_count,
            raw_byte_size: block.raw_byte_size,
        }
    }
}

/// Row for `current` keyed by its requested height, diffed against the block before it.
pub fn time_diff(height: u64, current: &BlockRecord, previous: &BlockRecord) -> TimeDiffRow {
    TimeDiffRow {
        height,
        diff_seconds: (current.timestamp - previous.timestamp).as_seconds_f64(),
    }
}
