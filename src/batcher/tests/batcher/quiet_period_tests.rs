//! Quiet-period flushes driven by a fake clock.

use super::common::{
    settle, wait_for_waiters, Harness, DEFAULT_MAX_ITEMS, DEFAULT_QUIET_PERIOD,
};
use batcher::{count_items, Batcher, BatcherConfig};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn flushes_buffered_items_after_quiet_period() {
    let harness = Harness::start(DEFAULT_MAX_ITEMS, count_items);
    harness.send_all([1, 2]).await;
    harness.wait_for_buffer_len(2).await;

    harness.clock.step(DEFAULT_QUIET_PERIOD);
    harness.results.wait_for_batches(1).await;

    assert_eq!(harness.results.batches(), vec![vec![1, 2]]);
    assert_eq!(harness.stats.snapshot().quiet_period_flushes, 1);
    harness.shutdown().await;
}

#[tokio::test]
async fn idle_quiet_period_emits_nothing_then_each_window_flushes_once() {
    let harness = Harness::start(DEFAULT_MAX_ITEMS, count_items);

    // Initial quiet period with an empty buffer.
    harness.wait_for_timer().await;
    harness.clock.step(DEFAULT_QUIET_PERIOD);
    // The timer fired and was re-armed without emitting anything.
    harness.wait_for_timer().await;
    settle().await;
    assert_eq!(harness.results.len(), 0);

    harness.send_all([1, 2]).await;
    harness.wait_for_buffer_len(2).await;
    harness.clock.step(DEFAULT_QUIET_PERIOD);
    harness.results.wait_for_batches(1).await;

    harness.send_all([3, 4]).await;
    harness.wait_for_buffer_len(2).await;
    harness.clock.step(DEFAULT_QUIET_PERIOD);
    harness.results.wait_for_batches(2).await;

    assert_eq!(harness.results.batches(), vec![vec![1, 2], vec![3, 4]]);
    assert_eq!(harness.stats.snapshot().quiet_period_flushes, 2);
    harness.shutdown().await;
}

#[tokio::test]
async fn partial_quiet_period_does_not_flush() {
    let harness = Harness::start(DEFAULT_MAX_ITEMS, count_items);
    harness.wait_for_timer().await;
    harness.send_all([1]).await;
    harness.wait_for_buffer_len(1).await;

    harness.clock.step(DEFAULT_QUIET_PERIOD - Duration::from_secs(1));
    settle().await;
    assert_eq!(harness.results.len(), 0);
    assert_eq!(harness.stats.buffered(), 1);

    harness.clock.step(Duration::from_secs(1));
    harness.results.wait_for_batches(1).await;
    assert_eq!(harness.results.batches(), vec![vec![1]]);
    harness.shutdown().await;
}

#[tokio::test]
async fn weight_flush_restarts_quiet_period() {
    let harness = Harness::start(DEFAULT_MAX_ITEMS, count_items);
    harness.wait_for_timer().await;

    harness.clock.step(Duration::from_secs(3));
    harness.send_all([1, 2, 3]).await;
    harness.results.wait_for_batches(1).await;

    harness.send_all([4]).await;
    harness.wait_for_buffer_len(1).await;

    // Where the original deadline would have been: no flush any more.
    harness.clock.step(Duration::from_secs(2));
    settle().await;
    assert_eq!(harness.results.len(), 1);

    // A full quiet period after the weight flush.
    harness.clock.step(Duration::from_secs(3));
    harness.results.wait_for_batches(2).await;
    assert_eq!(harness.results.batches(), vec![vec![1, 2, 3], vec![4]]);
    harness.shutdown().await;
}

#[tokio::test]
async fn timer_keeps_rearming_while_idle() {
    let harness = Harness::start(DEFAULT_MAX_ITEMS, count_items);
    for _ in 0..3 {
        wait_for_waiters(&harness.clock, 1).await;
        harness.clock.step(DEFAULT_QUIET_PERIOD);
    }
    harness.wait_for_timer().await;
    settle().await;
    assert_eq!(harness.stats.snapshot().batches_out, 0);
    harness.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn system_clock_flushes_after_quiet_period() {
    let (input, input_rx) = mpsc::channel(4);
    let (output_tx, mut output_rx) = mpsc::channel(4);
    let config = BatcherConfig::new(DEFAULT_MAX_ITEMS, DEFAULT_QUIET_PERIOD);
    let mut batcher =
        Batcher::new(input_rx, config, count_items, output_tx).expect("valid config");
    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { batcher.run(&run_cancel).await });

    let start = tokio::time::Instant::now();
    input.send(1i64).await.expect("send");
    input.send(2).await.expect("send");

    let batch = timeout(Duration::from_secs(60), output_rx.recv())
        .await
        .expect("quiet period flush")
        .expect("output open");
    assert_eq!(batch, vec![1, 2]);
    assert!(start.elapsed() >= DEFAULT_QUIET_PERIOD);

    cancel.cancel();
    let exit = run.await.expect("batcher task").expect("batcher run");
    assert_eq!(exit, batcher::BatcherExit::Cancelled);
}
