pub mod collector;
pub mod instance;
pub mod metrics;

pub use collector::spawn_stats_collector;
pub use instance::{batcher_instance_id, set_batcher_instance_id};
pub use metrics::{
    publish_snapshot, BATCHES_OUT_GAUGE, BUFFERED_ITEMS_GAUGE, DROPPED_ITEMS_GAUGE,
    ITEMS_IN_GAUGE, ITEMS_OUT_GAUGE, QUIET_PERIOD_FLUSHES_GAUGE, SHUTDOWN_FLUSHES_GAUGE,
    WEIGHT_FLUSHES_GAUGE,
};
