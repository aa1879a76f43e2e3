//! Micro-batching primitive.
//!
//! A [`Batcher`] drains items from an mpsc receiver and re-emits them as
//! ordered batches on an mpsc sender. A batch is flushed when the accumulated
//! weight reaches `max_weight` or when `max_quiet_period` elapses since the
//! previous flush, whichever happens first.

pub mod batcher;
pub mod clock;
pub mod config;
pub mod error;
pub mod stats;

pub use batcher::{count_items, Batcher, BatcherExit, FlushTrigger, WeightFn};
pub use clock::{Clock, ClockSleep, FakeClock, SystemClock};
pub use config::BatcherConfig;
pub use error::BatcherError;
pub use stats::{BatcherStats, BatcherStatsSnapshot};
