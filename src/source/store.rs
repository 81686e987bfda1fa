//! Purpose: MongoDB-backed ranged query over stored block documents.
//! Exports: `MongoStore`, `MongoCursor`, `StoreOptions`, `project_document`.
//! Role: Ranged-query record source for the block-export pipeline.
//! Invariants: Connection setup (parse, connect, ping) is bounded by a 10 second timeout.
//! Invariants: Each stored document is projected twice: generic (for byte size) and typed.
//! Invariants: The driver runs on a private current-thread runtime; callers see a blocking iterator.
use std::rc::Rc;
use std::time::Duration;

use mongodb::bson::{Document, RawDocument, RawDocumentBuf, doc};
use mongodb::options::{ClientOptions, FindOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection, Cursor};
use serde::Deserialize;
use tokio::runtime::{Builder, Runtime};

use super::{BlockDocument, DocumentStore};
use crate::core::error::{Error, ErrorKind};
use crate::core::range::HeightRange;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DATABASE: &str = "catapult";
pub const DEFAULT_COLLECTION: &str = "blocks";

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub url: String,
    pub database: String,
    pub collection: String,
}

impl StoreOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

pub struct MongoStore {
    collection: Option<Collection<RawDocumentBuf>>,
    runtime: Rc<Runtime>,
}

pub struct MongoCursor {
    cursor: Option<Cursor<RawDocumentBuf>>,
    runtime: Rc<Runtime>,
}

#[derive(Deserialize)]
struct StoredBlock {
    block: StoredHeader,
    meta: StoredMeta,
}

#[derive(Deserialize)]
struct StoredHeader {
    height: i64,
}

#[derive(Deserialize)]
struct StoredMeta {
    #[serde(rename = "numTransactions")]
    num_transactions: i64,
}

impl MongoStore {
    pub fn connect(options: &StoreOptions) -> Result<Self, Error> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to start database runtime")
                    .with_source(err)
            })?;

        let client = runtime.block_on(async {
            tokio::time::timeout(CONNECT_TIMEOUT, connect_and_ping(&options.url))
                .await
                .map_err(|_| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to connect to the database")
                        .with_hint(format!(
                            "connection not established within {}s",
                            CONNECT_TIMEOUT.as_secs()
                        ))
                })?
        })?;

        tracing::debug!(
            database = %options.database,
            collection = %options.collection,
            "connected to document store"
        );
        let collection = client
            .database(&options.database)
            .collection::<RawDocumentBuf>(&options.collection);
        Ok(Self {
            collection: Some(collection),
            runtime: Rc::new(runtime),
        })
    }
}

async fn client_options(url: &str) -> Result<ClientOptions, Error> {
    let mut client_options = ClientOptions::parse(url).await.map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid database url")
            .with_source(err)
    })?;
    client_options.connect_timeout = Some(CONNECT_TIMEOUT);
    client_options.server_selection_timeout = Some(CONNECT_TIMEOUT);
    Ok(client_options)
}

async fn connect_and_ping(url: &str) -> Result<Client, Error> {
    let client = Client::with_options(client_options(url).await?).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to connect to the database")
            .with_source(err)
    })?;
    client
        .database("admin")
        .run_command(
            doc! { "ping": 1 },
            SelectionCriteria::ReadPreference(ReadPreference::Primary),
        )
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to ping database")
                .with_source(err)
        })?;
    Ok(client)
}

impl DocumentStore for MongoStore {
    type Cursor = MongoCursor;

    fn blocks_in(&self, range: HeightRange) -> Result<MongoCursor, Error> {
        let collection = self.collection.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("document store is closed")
        })?;
        let (filter, find_options) = range_query(range)?;
        let cursor = self
            .runtime
            .block_on(collection.find(filter, find_options))
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to fetch data from database")
                    .with_source(err)
            })?;
        Ok(MongoCursor {
            cursor: Some(cursor),
            runtime: Rc::clone(&self.runtime),
        })
    }
}

impl Drop for MongoStore {
    fn drop(&mut self) {
        // Driver handles spawn cleanup tasks and need a runtime context.
        let _context = self.runtime.enter();
        self.collection.take();
    }
}

impl MongoCursor {
    fn close(&mut self) {
        let _context = self.runtime.enter();
        self.cursor.take();
    }
}

impl Iterator for MongoCursor {
    type Item = Result<BlockDocument, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        let item = match self.runtime.block_on(cursor.advance()) {
            Ok(true) => return Some(project_document(cursor.current())),
            Ok(false) => None,
            Err(err) => Some(Err(Error::new(ErrorKind::Io)
                .with_message("failed to read from database cursor")
                .with_source(err))),
        };
        self.close();
        item
    }
}

impl Drop for MongoCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Builds a `BlockDocument` from one stored payload.
///
/// The generic projection is re-encoded to measure the document's exact byte
/// size; the typed projection supplies height and transaction count.
pub fn project_document(raw: &RawDocument) -> Result<BlockDocument, Error> {
    let generic = Document::from_reader(&mut raw.as_bytes()).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("failed to decode block document")
            .with_source(err)
    })?;
    let mut canonical = Vec::new();
    generic.to_writer(&mut canonical).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to re-encode block document")
            .with_source(err)
    })?;

    let typed: StoredBlock = mongodb::bson::from_slice(raw.as_bytes()).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("failed to decode block fields")
            .with_source(err)
    })?;
    let height = u64::try_from(typed.block.height).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("negative block height")
            .with_source(err)
    })?;
    let transaction_count = u64::try_from(typed.meta.num_transactions).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("negative transaction count")
            .with_height(height)
            .with_source(err)
    })?;

    Ok(BlockDocument {
        height,
        transaction_count,
        raw_byte_size: canonical.len(),
    })
}

/// Filter selecting `block.height` in `[start, end]`, sorted ascending by height.
fn range_query(range: HeightRange) -> Result<(Document, FindOptions), Error> {
    let filter = doc! {
        "block.height": {
            "$gte": bson_height(range.start())?,
            "$lte": bson_height(range.end())?,
        }
    };
    let find_options = FindOptions::builder()
        .sort(doc! { "block.height": 1 })
        .build();
    Ok((filter, find_options))
}

fn bson_height(height: u64) -> Result<i64, Error> {
    i64::try_from(height).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("height does not fit a stored 64-bit integer")
            .with_height(height)
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::{
        CONNECT_TIMEOUT, StoreOptions, bson_height, client_options, project_document, range_query,
    };
    use crate::core::error::ErrorKind;
    use crate::core::range::HeightRange;
    use mongodb::bson::{RawDocumentBuf, doc};
    use std::time::Duration;

    fn stored(height: i64, transactions: i32) -> RawDocumentBuf {
        let document = doc! {
            "meta": {
                "hash": "D1A9E5C1B7",
                "numTransactions": transactions,
            },
            "block": {
                "height": height,
                "timestamp": 1_234_567_i64,
                "signer": "AAAA",
            },
        };
        RawDocumentBuf::from_document(&document).expect("raw document")
    }

    #[test]
    fn projection_measures_exact_encoded_size() {
        let raw = stored(812, 3);
        let block = project_document(&raw).expect("project");
        assert_eq!(block.height, 812);
        assert_eq!(block.transaction_count, 3);
        assert_eq!(block.raw_byte_size, raw.as_bytes().len());
    }

    #[test]
    fn projection_size_counts_fields_outside_the_typed_shape() {
        let bare = doc! {
            "meta": { "numTransactions": 0 },
            "block": { "height": 1_i64 },
        };
        let mut padded = bare.clone();
        padded.insert("transactions", vec!["a", "b", "c"]);

        let bare_raw = RawDocumentBuf::from_document(&bare).expect("raw");
        let padded_raw = RawDocumentBuf::from_document(&padded).expect("raw");
        let bare_size = project_document(&bare_raw).expect("bare").raw_byte_size;
        let padded_size = project_document(&padded_raw).expect("padded").raw_byte_size;

        assert_eq!(bare_size, bare_raw.as_bytes().len());
        assert_eq!(padded_size, padded_raw.as_bytes().len());
        assert!(padded_size > bare_size);
    }

    #[test]
    fn projection_rejects_missing_or_negative_fields() {
        let raw = RawDocumentBuf::from_document(&doc! { "block": { "height": 5_i64 } })
            .expect("raw");
        let err = project_document(&raw).expect_err("missing meta");
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        let err = project_document(&stored(-1, 2)).expect_err("negative height");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn store_options_default_to_catapult_blocks() {
        let options = StoreOptions::new("mongodb://localhost:27017");
        assert_eq!(options.database, "catapult");
        assert_eq!(options.collection, "blocks");
    }

    #[test]
    fn heights_beyond_i64_are_rejected() {
        assert_eq!(bson_height(42).expect("fits"), 42);
        let err = bson_height(u64::MAX).expect_err("overflow");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn range_query_selects_inclusive_heights_in_ascending_order() {
        let range = HeightRange::new(5, 8).expect("range");
        let (filter, find_options) = range_query(range).expect("query");
        assert_eq!(
            filter,
            doc! { "block.height": { "$gte": 5_i64, "$lte": 8_i64 } }
        );
        assert_eq!(find_options.sort, Some(doc! { "block.height": 1 }));
    }

    #[test]
    fn client_options_bound_connection_setup_to_ten_seconds() {
        assert_eq!(CONNECT_TIMEOUT, Duration::from_secs(10));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let options = runtime
            .block_on(client_options("mongodb://localhost:27017"))
            .expect("options");
        assert_eq!(options.connect_timeout, Some(CONNECT_TIMEOUT));
        assert_eq!(options.server_selection_timeout, Some(CONNECT_TIMEOUT));

        let err = runtime
            .block_on(client_options("not-a-connection-string"))
            .expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
