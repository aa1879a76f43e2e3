// Main library entry point
// The batching engine itself lives in the `batcher` crate; this crate wires
// it to configuration, logging and the line-oriented runner.

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod runner;

pub use batcher::{Batcher, BatcherConfig, BatcherError, BatcherExit, FlushTrigger};
pub use runner::{run_lines, LinePipeline, RunReport, RunnerOptions};
