//! Purpose: Shared command-line plumbing for the `block-time-diff` and `block-export` binaries.
//! Exports: `TimeDiffCli`, `ExportCli`, `Command`, `run_main`.
//! Role: Parses flags, installs logging, runs one pipeline, renders errors, picks the exit code.
//! Invariants: Help/version exit 0; any other parse failure is a `Usage` error (exit 2).
//! Invariants: Errors go to stderr as plain text, one `error:` line plus context lines.
//! Invariants: Progress logging goes to stdout through `tracing`.
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, ValueHint, error::ErrorKind as ClapErrorKind};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

use crate::config::{ExportConfig, TimeDiffConfig};
use crate::core::error::{Error, ErrorKind, to_exit_code};
use crate::pipeline::{run_block_export, run_time_diff};
use crate::source::{
    DEFAULT_COLLECTION, DEFAULT_DATABASE, MongoStore, RestClient, StoreOptions,
};

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    #[arg(long, help = "Start block height (inclusive)")]
    pub start: u64,
    #[arg(long, help = "End block height (inclusive)")]
    pub end: u64,
    #[arg(
        long,
        default_value = ".",
        help = "Directory the CSV file is written to",
        value_hint = ValueHint::DirPath
    )]
    pub out_dir: PathBuf,
}

#[derive(Parser, Debug)]
#[command(
    name = "block-time-diff",
    version,
    about = "Write the time between consecutive blocks to block_timestamp_diff.csv",
    after_help = r#"EXAMPLES
  $ block-time-diff --start 100 --end 200 --url http://localhost:3000
  $ RUST_LOG=warn block-time-diff --start 1 --end 5000 --url https://node.example"#
)]
pub struct TimeDiffCli {
    #[command(flatten)]
    pub range: RangeArgs,
    #[arg(long, help = "Chain REST server URL", value_hint = ValueHint::Url)]
    pub url: String,
}

#[derive(Parser, Debug)]
#[command(
    name = "block-export",
    version,
    about = "Export stored block heights, transaction counts, and document sizes to CSV",
    after_help = r#"EXAMPLES
  $ block-export --start 1 --end 1000 --url mongodb://localhost:27017
  # writes blocks-1-<highest height found>.csv"#
)]
pub struct ExportCli {
    #[command(flatten)]
    pub range: RangeArgs,
    #[arg(long, help = "Database URL", value_hint = ValueHint::Url)]
    pub url: String,
    #[arg(long = "db", default_value = DEFAULT_DATABASE, help = "Database name")]
    pub database: String,
    #[arg(long, default_value = DEFAULT_COLLECTION, help = "Block collection name")]
    pub collection: String,
}

pub trait Command: Parser {
    fn execute(self) -> Result<(), Error>;
}

impl Command for TimeDiffCli {
    fn execute(self) -> Result<(), Error> {
        let config = TimeDiffConfig::new(
            self.range.start,
            self.range.end,
            self.url,
            self.range.out_dir,
        )?;
        let client = RestClient::new(config.url.clone())?;
        tracing::debug!(range = %config.range, url = %client.base_url(), "fetching block timestamps");
        let outcome = run_time_diff(&config, &client)?;
        tracing::debug!(
            rows = outcome.rows,
            skipped = outcome.skipped,
            "timestamp diff complete"
        );
        Ok(())
    }
}

impl Command for ExportCli {
    fn execute(self) -> Result<(), Error> {
        let store = StoreOptions {
            url: self.url,
            database: self.database,
            collection: self.collection,
        };
        let config = ExportConfig::new(self.range.start, self.range.end, store, self.range.out_dir)?;
        let store = MongoStore::connect(&config.store)?;
        let outcome = run_block_export(&config, &store)?;
        tracing::debug!(
            rows = outcome.rows,
            max_height = outcome.max_observed_height,
            "block export complete"
        );
        Ok(())
    }
}

/// Runs `C` against the process arguments and returns the exit code.
pub fn run_main<C: Command>() -> i32 {
    run_with_args::<C, _>(std::env::args_os())
}

pub fn run_with_args<C, I>(args: I) -> i32
where
    C: Command,
    I: IntoIterator<Item = OsString>,
{
    let command = match C::try_parse_from(args) {
        Ok(command) => command,
        Err(err) => return handle_parse_error(&err),
    };

    install_progress_log();
    match command.execute() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    }
}

fn handle_parse_error(err: &clap::Error) -> i32 {
    match err.kind() {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => match err.print() {
            Ok(()) => 0,
            Err(io_err) => {
                let err = Error::new(ErrorKind::Io)
                    .with_message("failed to write help")
                    .with_source(io_err);
                emit_error(&err);
                to_exit_code(err.kind())
            }
        },
        _ => {
            let _ = err.print();
            to_exit_code(ErrorKind::Usage)
        }
    }
}

/// Progress lines go to stdout so stderr carries only the final error.
fn install_progress_log() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .without_time()
        .try_init();
}

fn emit_error(err: &Error) {
    eprintln!("{}", render_error(err));
}

fn render_error(err: &Error) -> String {
    let message = err.message().unwrap_or(match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::NotFound => "not found",
        ErrorKind::Corrupt => "corrupt data",
        ErrorKind::Io => "i/o error",
    });
    let mut out = format!("error: {message}");
    if let Some(height) = err.height() {
        out.push_str(&format!("\nheight: {height}"));
    }
    if let Some(path) = err.path() {
        out.push_str(&format!("\npath: {}", path.display()));
    }
    let mut cause = err.source();
    while let Some(source) = cause {
        out.push_str(&format!("\ncaused by: {source}"));
        cause = source.source();
    }
    if let Some(hint) = err.hint() {
        out.push_str(&format!("\nhint: {hint}"));
    }
    out
}
