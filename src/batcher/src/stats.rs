use crate::batcher::FlushTrigger;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between a running batcher and its observers.
///
/// The run loop is the only writer; every reader goes through atomics so
/// observation never blocks the loop.
#[derive(Debug, Default)]
pub struct BatcherStats {
    buffered: AtomicUsize,
    items_in: AtomicU64,
    items_out: AtomicU64,
    batches_out: AtomicU64,
    weight_flushes: AtomicU64,
    quiet_period_flushes: AtomicU64,
    shutdown_flushes: AtomicU64,
    dropped_items: AtomicU64,
}

impl BatcherStats {
    /// Number of items currently held in the buffer.
    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    pub(crate) fn set_buffered(&self, len: usize) {
        self.buffered.store(len, Ordering::Release);
    }

    pub(crate) fn record_in(&self) {
        self.items_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, trigger: FlushTrigger, items: usize) {
        self.items_out.fetch_add(items as u64, Ordering::Relaxed);
        self.batches_out.fetch_add(1, Ordering::Relaxed);
        let counter = match trigger {
            FlushTrigger::Weight => &self.weight_flushes,
            FlushTrigger::QuietPeriod => &self.quiet_period_flushes,
            FlushTrigger::Shutdown => &self.shutdown_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, items: usize) {
        self.dropped_items.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BatcherStatsSnapshot {
        BatcherStatsSnapshot {
            buffered: self.buffered() as u64,
            items_in: self.items_in.load(Ordering::Relaxed),
            items_out: self.items_out.load(Ordering::Relaxed),
            batches_out: self.batches_out.load(Ordering::Relaxed),
            weight_flushes: self.weight_flushes.load(Ordering::Relaxed),
            quiet_period_flushes: self.quiet_period_flushes.load(Ordering::Relaxed),
            shutdown_flushes: self.shutdown_flushes.load(Ordering::Relaxed),
            dropped_items: self.dropped_items.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatcherStatsSnapshot {
    pub buffered: u64,
    pub items_in: u64,
    pub items_out: u64,
    pub batches_out: u64,
    pub weight_flushes: u64,
    pub quiet_period_flushes: u64,
    pub shutdown_flushes: u64,
    pub dropped_items: u64,
}
