//! Batcher - groups individually arriving items into weight/time bounded batches.

use crate::clock::{Clock, SystemClock};
use crate::config::BatcherConfig;
use crate::error::BatcherError;
use crate::stats::BatcherStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BATCHER_ID: &str = "batcher";

/// Contribution of one item toward `max_weight`.
pub type WeightFn<T> = Arc<dyn Fn(&T) -> usize + Send + Sync>;

/// Default weight function: every item counts as one.
pub fn count_items<T>(_item: &T) -> usize {
    1
}

/// What caused a batch to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    /// Accumulated weight reached `max_weight`.
    Weight,
    /// `max_quiet_period` elapsed since the previous flush.
    QuietPeriod,
    /// Remaining items flushed while the run loop shuts down.
    Shutdown,
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushTrigger::Weight => f.write_str("weight"),
            FlushTrigger::QuietPeriod => f.write_str("quiet_period"),
            FlushTrigger::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Why [`Batcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatcherExit {
    /// Every sender of the input channel was dropped.
    InputClosed,
    /// The cancellation token fired.
    Cancelled,
}

struct Batch<T> {
    items: Vec<T>,
    weight: usize,
    opened_at: Option<Instant>,
}

struct Buffer<T> {
    items: Vec<T>,
    weight: usize,
    opened_at: Option<Instant>,
}

impl<T> Buffer<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            weight: 0,
            opened_at: None,
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, item: T, weight: usize, now: Instant) {
        if self.items.is_empty() {
            self.opened_at = Some(now);
        }
        self.items.push(item);
        self.weight = self.weight.saturating_add(weight);
    }

    fn take(&mut self) -> Option<Batch<T>> {
        if self.items.is_empty() {
            return None;
        }
        Some(Batch {
            items: std::mem::take(&mut self.items),
            weight: std::mem::take(&mut self.weight),
            opened_at: self.opened_at.take(),
        })
    }
}

enum Delivery<T> {
    Sent,
    /// Cancelled while waiting for sink capacity; the batch was not delivered.
    Interrupted(Batch<T>),
}

/// Buffers items from `input` and emits them as `Vec<T>` batches on `output`.
///
/// The run loop exclusively owns the buffer, the weight accumulator and the
/// quiet-period timer. The only state visible to other tasks is
/// [`BatcherStats`], which is updated through atomics.
pub struct Batcher<T> {
    id: String,
    input: mpsc::Receiver<T>,
    output: mpsc::Sender<Vec<T>>,
    config: BatcherConfig,
    weight_fn: WeightFn<T>,
    clock: Arc<dyn Clock>,
    stats: Arc<BatcherStats>,
}

impl<T> Batcher<T> {
    pub fn new<F>(
        input: mpsc::Receiver<T>,
        config: BatcherConfig,
        weight_fn: F,
        output: mpsc::Sender<Vec<T>>,
    ) -> Result<Self, BatcherError>
    where
        F: Fn(&T) -> usize + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            id: DEFAULT_BATCHER_ID.to_string(),
            input,
            output,
            config,
            weight_fn: Arc::new(weight_fn),
            clock: Arc::new(SystemClock),
            stats: Arc::new(BatcherStats::default()),
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Live counters, including the buffered item count. Clone the handle
    /// before calling [`Batcher::run`] to observe the batcher while it runs.
    pub fn stats(&self) -> Arc<BatcherStats> {
        Arc::clone(&self.stats)
    }

    /// Drive the batcher until the input closes or `cancel` fires.
    ///
    /// Any items still buffered on the way out are flushed, waiting at most
    /// `final_flush_grace` for the sink to accept them. The output sender is
    /// left untouched; closing it is up to the owner of the batcher.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<BatcherExit, BatcherError> {
        let quiet_period = self.config.max_quiet_period;
        let mut buffer = Buffer::new();
        let mut interrupted = None;
        let mut timer = self.clock.sleep(quiet_period);
        tracing::info!(
            batcher_id = %self.id,
            max_weight = self.config.max_weight,
            max_quiet_period = ?quiet_period,
            "batcher starting"
        );

        let exit = loop {
            let trigger = tokio::select! {
                biased;
                _ = cancel.cancelled() => break BatcherExit::Cancelled,
                _ = &mut timer => {
                    if buffer.is_empty() {
                        timer = self.clock.sleep(quiet_period);
                        continue;
                    }
                    FlushTrigger::QuietPeriod
                }
                item = self.input.recv() => match item {
                    Some(item) => {
                        let weight = (self.weight_fn)(&item);
                        buffer.push(item, weight, self.clock.now());
                        self.stats.record_in();
                        self.stats.set_buffered(buffer.len());
                        if buffer.weight < self.config.max_weight {
                            continue;
                        }
                        FlushTrigger::Weight
                    }
                    None => break BatcherExit::InputClosed,
                },
            };

            let Some(batch) = buffer.take() else {
                continue;
            };
            self.stats.set_buffered(0);
            match self.emit(batch, trigger, cancel).await? {
                Delivery::Sent => timer = self.clock.sleep(quiet_period),
                Delivery::Interrupted(batch) => {
                    interrupted = Some(batch);
                    break BatcherExit::Cancelled;
                }
            }
        };

        let remaining = interrupted.or_else(|| buffer.take());
        self.stats.set_buffered(0);
        if let Some(batch) = remaining {
            self.emit_final(batch).await?;
        }
        tracing::info!(batcher_id = %self.id, exit = ?exit, "batcher stopped");
        Ok(exit)
    }

    async fn emit(
        &self,
        batch: Batch<T>,
        trigger: FlushTrigger,
        cancel: &CancellationToken,
    ) -> Result<Delivery<T>, BatcherError> {
        tokio::select! {
            biased;
            permit = self.output.reserve() => match permit {
                Ok(permit) => {
                    self.deliver(permit, batch, trigger);
                    Ok(Delivery::Sent)
                }
                Err(_) => Err(self.output_closed(batch)),
            },
            _ = cancel.cancelled() => {
                tracing::debug!(
                    batcher_id = %self.id,
                    items = batch.items.len(),
                    %trigger,
                    "flush interrupted by cancellation"
                );
                Ok(Delivery::Interrupted(batch))
            }
        }
    }

    async fn emit_final(&self, batch: Batch<T>) -> Result<(), BatcherError> {
        let grace = self.config.final_flush_grace;
        let deadline = self.clock.sleep(grace);
        tokio::select! {
            biased;
            permit = self.output.reserve() => match permit {
                Ok(permit) => {
                    self.deliver(permit, batch, FlushTrigger::Shutdown);
                    Ok(())
                }
                Err(_) => Err(self.output_closed(batch)),
            },
            _ = deadline => {
                let dropped = batch.items.len();
                self.stats.record_dropped(dropped);
                tracing::warn!(
                    batcher_id = %self.id,
                    dropped,
                    grace = ?grace,
                    "output did not accept final batch in time, dropping it"
                );
                Ok(())
            }
        }
    }

    fn deliver(&self, permit: mpsc::Permit<'_, Vec<T>>, batch: Batch<T>, trigger: FlushTrigger) {
        let items = batch.items.len();
        let age = batch
            .opened_at
            .map(|opened_at| self.clock.now().saturating_duration_since(opened_at));
        permit.send(batch.items);
        self.stats.record_flush(trigger, items);
        tracing::debug!(
            batcher_id = %self.id,
            items,
            weight = batch.weight,
            age = ?age,
            %trigger,
            "flushed batch"
        );
    }

    fn output_closed(&self, batch: Batch<T>) -> BatcherError {
        let dropped = batch.items.len();
        self.stats.record_dropped(dropped);
        tracing::error!(batcher_id = %self.id, dropped, "batch output closed");
        BatcherError::OutputClosed { dropped }
    }
}
