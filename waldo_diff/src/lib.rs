// THEORY:
// This file is the main entry point for the `waldo_diff` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (the `diff_tester` CLI, a web
// handler, a puzzle generator).
//
// The primary goal is to export the `DiffPipeline` (and its async sibling
// `ParallelDiffPipeline`) together with `DiffSettings` and `DiffReport` as the
// clean, high-level interface for the whole engine. The stage modules live in
// `core_modules` and stay usable on their own, most notably the grouping
// engine, which is the part that actually decides what counts as "one
// difference".

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::DiffSettings;
pub use core_modules::grouping::{DifferenceGroup, GroupingEngine, GroupingStats};
pub use core_modules::region::DifferenceRegion;
pub use core_modules::similarity::{SimilarityMode, SimilarityProfile};
pub use core_modules::utils::codec::OutputFormat;
pub use error::{DiffError, ImageSlot, Result, Stage};
pub use parallel_pipeline::ParallelDiffPipeline;
pub use pipeline::{DiffPipeline, DiffReport, EncodedReport};
