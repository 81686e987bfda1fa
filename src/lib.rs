//! Purpose: Library behind the `block-time-diff` and `block-export` binaries.
//! Exports: `core` (errors, height ranges), `source`, `transform`, `sink`, `pipeline`, `config`, `cli`.
//! Role: Range-bounded block fetch, per-record transform, and CSV serialization.
//! Invariants: Pipelines are single-threaded and take all settings from an explicit config.
pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod transform;
