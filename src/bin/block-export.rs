//! Purpose: `block-export` entry point.
//! Role: Queries stored blocks for a height range and writes blocks-{start}-{max}.csv.
use blockcsv::cli::{ExportCli, run_main};

fn main() {
    std::process::exit(run_main::<ExportCli>());
}
