//! Shared harness: a spawned batcher on a fake clock plus a result collector.
#![allow(dead_code)]

use batcher::{Batcher, BatcherConfig, BatcherError, BatcherExit, BatcherStats, FakeClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ITEMS: usize = 3;
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(5);
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Drains the batch receiver into a shared vector.
#[derive(Clone, Default)]
pub struct ResultCollector {
    batches: Arc<Mutex<Vec<Vec<i64>>>>,
}

impl ResultCollector {
    pub fn spawn(mut output: mpsc::Receiver<Vec<i64>>) -> Self {
        let collector = Self::default();
        let batches = Arc::clone(&collector.batches);
        tokio::spawn(async move {
            while let Some(batch) = output.recv().await {
                batches.lock().push(batch);
            }
        });
        collector
    }

    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn batches(&self) -> Vec<Vec<i64>> {
        self.batches.lock().clone()
    }

    pub async fn wait_for_batches(&self, expected: usize) {
        wait_until(|| self.len() >= expected, "batches").await;
    }
}

pub struct Harness {
    pub input: mpsc::Sender<i64>,
    pub clock: Arc<FakeClock>,
    pub stats: Arc<BatcherStats>,
    pub cancel: CancellationToken,
    pub results: ResultCollector,
    pub run: JoinHandle<Result<BatcherExit, BatcherError>>,
}

impl Harness {
    pub fn start<F>(max_weight: usize, weight_fn: F) -> Self
    where
        F: Fn(&i64) -> usize + Send + Sync + 'static,
    {
        let (input, input_rx) = mpsc::channel(1);
        let (output_tx, output_rx) = mpsc::channel(1);
        let clock = Arc::new(FakeClock::default());
        let config = BatcherConfig::new(max_weight, DEFAULT_QUIET_PERIOD);
        let mut batcher = Batcher::new(input_rx, config, weight_fn, output_tx)
            .expect("valid batcher config")
            .with_id("test_batcher")
            .with_clock(clock.clone());
        let stats = batcher.stats();
        let cancel = CancellationToken::new();
        let results = ResultCollector::spawn(output_rx);
        let run_cancel = cancel.clone();
        let run = tokio::spawn(async move {
            let exit = batcher.run(&run_cancel).await;
            // Dropping the batcher releases its sender and closes the output.
            drop(batcher);
            exit
        });
        Self {
            input,
            clock,
            stats,
            cancel,
            results,
            run,
        }
    }

    pub async fn send_all(&self, items: impl IntoIterator<Item = i64>) {
        for item in items {
            self.input.send(item).await.expect("batcher input open");
        }
    }

    pub async fn wait_for_buffer_len(&self, expected: usize) {
        wait_for_buffer_len(&self.stats, expected).await;
    }

    pub async fn wait_for_timer(&self) {
        wait_for_waiters(&self.clock, 1).await;
    }

    pub async fn shutdown(self) -> BatcherExit {
        self.cancel.cancel();
        timeout(WAIT_TIMEOUT, self.run)
            .await
            .expect("batcher did not stop in time")
            .expect("batcher task panicked")
            .expect("batcher run failed")
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    let waited = timeout(WAIT_TIMEOUT, async {
        while !condition() {
            sleep(POLL_INTERVAL).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

pub async fn wait_for_buffer_len(stats: &BatcherStats, expected: usize) {
    wait_until(|| stats.buffered() >= expected, "buffered items").await;
}

pub async fn wait_for_waiters(clock: &FakeClock, expected: usize) {
    wait_until(|| clock.waiter_count() >= expected, "clock waiters").await;
}

/// Give the run loop a chance to act on anything it could react to.
pub async fn settle() {
    sleep(Duration::from_millis(50)).await;
}
