use crate::metrics::publish_snapshot;
use batcher::BatcherStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Periodically copy `stats` into the prometheus gauges until the task is aborted.
pub fn spawn_stats_collector(stats: Arc<BatcherStats>, poll_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            publish_snapshot(&stats.snapshot());
        }
    })
}
