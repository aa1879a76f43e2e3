use batcher::BatcherStatsSnapshot;
use once_cell::sync::Lazy;
use prometheus::{IntGauge, Opts};

use crate::instance::batcher_instance_id;

fn register_int_gauge_with_batcher(name: &str, help: &str) -> IntGauge {
    let opts = Opts::new(name, help).const_label("batcher", batcher_instance_id());
    let gauge = IntGauge::with_opts(opts).expect("create int gauge");
    prometheus::register(Box::new(gauge.clone())).expect("register int gauge");
    gauge
}

pub static BUFFERED_ITEMS_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher("batcher_buffered_items", "Items waiting in the buffer")
});

pub static ITEMS_IN_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher("batcher_items_in_total", "Items received from the input")
});

pub static ITEMS_OUT_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher("batcher_items_out_total", "Items delivered inside batches")
});

pub static BATCHES_OUT_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher("batcher_batches_out_total", "Batches delivered to the output")
});

pub static WEIGHT_FLUSHES_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher(
        "batcher_weight_flushes_total",
        "Batches flushed because max_weight was reached",
    )
});

pub static QUIET_PERIOD_FLUSHES_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher(
        "batcher_quiet_period_flushes_total",
        "Batches flushed because the quiet period elapsed",
    )
});

pub static SHUTDOWN_FLUSHES_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher(
        "batcher_shutdown_flushes_total",
        "Batches flushed while the batcher was stopping",
    )
});

pub static DROPPED_ITEMS_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge_with_batcher(
        "batcher_dropped_items_total",
        "Items dropped because the output did not accept them during shutdown",
    )
});

fn clamp_u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Mirror a stats snapshot into the exported gauges.
pub fn publish_snapshot(snapshot: &BatcherStatsSnapshot) {
    BUFFERED_ITEMS_GAUGE.set(clamp_u64_to_i64(snapshot.buffered));
    ITEMS_IN_GAUGE.set(clamp_u64_to_i64(snapshot.items_in));
    ITEMS_OUT_GAUGE.set(clamp_u64_to_i64(snapshot.items_out));
    BATCHES_OUT_GAUGE.set(clamp_u64_to_i64(snapshot.batches_out));
    WEIGHT_FLUSHES_GAUGE.set(clamp_u64_to_i64(snapshot.weight_flushes));
    QUIET_PERIOD_FLUSHES_GAUGE.set(clamp_u64_to_i64(snapshot.quiet_period_flushes));
    SHUTDOWN_FLUSHES_GAUGE.set(clamp_u64_to_i64(snapshot.shutdown_flushes));
    DROPPED_ITEMS_GAUGE.set(clamp_u64_to_i64(snapshot.dropped_items));
}
