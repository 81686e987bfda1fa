//! Purpose: HTTP client for a chain node's REST `GET /block/{height}` endpoint.
//! Exports: `RestClient`.
//! Role: Point-fetch record source for the timestamp-diff pipeline.
//! Invariants: One synchronous request per call; no caching, retries, or per-call timeout.
//! Invariants: uint64 values arrive as `[low, high]` u32 pairs; timestamps are
//! milliseconds since the network nemesis epoch and are returned in UTC.
use serde::Deserialize;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use url::Url;

use super::{BlockRecord, BlockSource};
use crate::core::error::{Error, ErrorKind};

type ApiResult<T> = Result<T, Error>;

const NEMESIS_EPOCH: OffsetDateTime = datetime!(2016-04-01 00:00:00 UTC);

pub struct RestClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct BlockInfoEnvelope {
    block: BlockDto,
}

#[derive(Deserialize)]
struct BlockDto {
    height: Uint64Dto,
    timestamp: Uint64Dto,
}

#[derive(Deserialize, Clone, Copy)]
struct Uint64Dto([u32; 2]);

impl Uint64Dto {
    fn value(self) -> u64 {
        let [low, high] = self.0;
        (u64::from(high) << 32) | u64::from(low)
    }
}

#[derive(Deserialize)]
struct RestError {
    code: Option<String>,
    message: Option<String>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self { base_url, agent })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn get_block_info(&self, url: &Url) -> ApiResult<BlockInfoEnvelope> {
        let body = match self.agent.get(url.as_str()).set("Accept", "application/json").call() {
            Ok(resp) => resp.into_string().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read response body")
                    .with_source(err)
            })?,
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(error_from_body(code, &body));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("request failed")
                    .with_source(err));
            }
        };
        serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("invalid block json")
                .with_source(err)
        })
    }
}

impl BlockSource for RestClient {
    fn fetch_block(&self, height: u64) -> ApiResult<BlockRecord> {
        let url = build_url(&self.base_url, &["block", &height.to_string()])?;
        let envelope = self
            .get_block_info(&url)
            .map_err(|err| err.with_height(height))?;
        block_from_remote(envelope.block).map_err(|err| err.with_height(height))
    }
}

fn block_from_remote(block: BlockDto) -> ApiResult<BlockRecord> {
    let millis = i64::try_from(block.timestamp.value()).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("block timestamp out of range")
            .with_source(err)
    })?;
    let timestamp = NEMESIS_EPOCH
        .checked_add(Duration::milliseconds(millis))
        .ok_or_else(|| {
            Error::new(ErrorKind::Corrupt).with_message("block timestamp out of range")
        })?;
    Ok(BlockRecord {
        height: block.height.value(),
        timestamp,
    })
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    if raw.trim().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("missing required flags"));
    }
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid REST server url")
            .with_hint("Use http(s)://host:port, e.g. http://localhost:3000.")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("REST server url must use http or https scheme"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("REST server url cannot be a base")
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn error_from_body(status: u16, body: &str) -> Error {
    let kind = error_kind_from_status(status);
    let mut err = Error::new(kind).with_message(format!("remote error status {status}"));
    if let Ok(remote) = serde_json::from_str::<RestError>(body) {
        if let Some(message) = remote.message {
            err = err.with_message(message);
        }
        if let Some(code) = remote.code {
            err = err.with_hint(format!("server code: {code}"));
        }
    }
    err
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 409 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
