//! Purpose: Validate operator-supplied block height bounds.
//! Exports: `HeightRange`.
//! Role: Range resolver shared by both export pipelines.
//! Invariants: Both bounds are >= 1; a range is immutable once built.
//! Invariants: `start < end`; a single-height range is rejected.
use std::fmt;
use std::ops::RangeInclusive;

use super::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeightRange {
    start: u64,
    end: u64,
}

impl HeightRange {
    pub fn new(start: u64, end: u64) -> Result<Self, Error> {
        ensure_positive(start, end)?;
        if start >= end {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("make sure 'start' is smaller than 'end'")
                .with_hint(format!("got --start {start} --end {end}")));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn count(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn heights(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }
}

impl fmt::Display for HeightRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

fn ensure_positive(start: u64, end: u64) -> Result<(), Error> {
    if start == 0 || end == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("missing required flags")
            .with_hint("--start and --end must both be positive heights"));
    }
    Ok(())
}
