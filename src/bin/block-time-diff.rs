//! Purpose: `block-time-diff` entry point.
//! Role: Fetches each block and its predecessor over REST and writes block_timestamp_diff.csv.
use blockcsv::cli::{TimeDiffCli, run_main};

fn main() {
    std::process::exit(run_main::<TimeDiffCli>());
}
