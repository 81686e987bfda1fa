//! Purpose: Record sources feeding the export pipelines.
//! Exports: `BlockRecord`, `BlockDocument`, `BlockSource`, `DocumentStore`, `RestClient`, `MongoStore`.
//! Role: Abstracts point lookups (REST node) and ranged queries (document store).
//! Invariants: Sources never retry; failure policy belongs to the caller.
//! Invariants: Ranged queries yield documents in ascending height order.

mod rest;
mod store;

use time::OffsetDateTime;

use crate::core::error::Error;
use crate::core::range::HeightRange;

pub use rest::RestClient;
pub use store::{
    CONNECT_TIMEOUT, DEFAULT_COLLECTION, DEFAULT_DATABASE, MongoCursor, MongoStore, StoreOptions,
    project_document,
};

/// One block as returned by a point lookup; timestamp is UTC.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockRecord {
    pub height: u64,
    pub timestamp: OffsetDateTime,
}

/// One stored block document with its exact re-encoded size.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockDocument {
    pub height: u64,
    pub transaction_count: u64,
    pub raw_byte_size: usize,
}

pub trait BlockSource {
    fn fetch_block(&self, height: u64) -> Result<BlockRecord, Error>;
}

pub trait DocumentStore {
    type Cursor: Iterator<Item = Result<BlockDocument, Error>>;

    /// Issues one query for every document with height in `range`, sorted ascending.
    fn blocks_in(&self, range: HeightRange) -> Result<Self::Cursor, Error>;
}
