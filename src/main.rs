use microbatch::bootstrap;
#[cfg(feature = "metrics")]
use microbatch::config::{MetricsConfig, DEFAULT_METRICS_ADDR, DEFAULT_METRICS_POLL_INTERVAL_SECS};
use microbatch::LinePipeline;
#[cfg(feature = "metrics")]
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// Stdin reads park a blocking thread that cannot be interrupted.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> Result<(), BoxError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run() -> Result<(), BoxError> {
    let bootstrap::BootstrapResult {
        options,
        metrics,
        logging_guard: _logging_guard,
    } = bootstrap::default_init()?;

    let pipeline = LinePipeline::new(&options)?;
    #[cfg(feature = "metrics")]
    init_metrics_exporter(&options.batcher_id, &metrics, pipeline.stats())?;
    #[cfg(not(feature = "metrics"))]
    let _ = metrics;

    tracing::info!(
        batcher_id = %options.batcher_id,
        max_weight = options.batcher.max_weight,
        max_quiet_period_ms = options.batcher.max_quiet_period.as_millis() as u64,
        channel_capacity = options.channel_capacity,
        "starting line batcher"
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl+c received, shutting down");
            signal_cancel.cancel();
        }
    });

    let report = pipeline
        .run(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            cancel,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "line batcher failed");
            err
        })?;

    tracing::info!(
        exit = ?report.exit,
        lines_read = report.lines_read,
        batches_written = report.batches_written,
        dropped_items = report.stats.dropped_items,
        "line batcher finished"
    );
    Ok(())
}

#[cfg(feature = "metrics")]
fn init_metrics_exporter(
    batcher_id: &str,
    cfg: &MetricsConfig,
    stats: std::sync::Arc<batcher::BatcherStats>,
) -> Result<(), BoxError> {
    let addr: SocketAddr = cfg
        .addr
        .as_deref()
        .unwrap_or(DEFAULT_METRICS_ADDR)
        .parse()?;
    tracing::info!(%addr, "enabling metrics exporter");
    telemetry::set_batcher_instance_id(batcher_id);
    let exporter = prometheus_exporter::start(addr)?;
    // The HTTP endpoint lives as long as the process.
    Box::leak(Box::new(exporter));

    let poll_interval = cfg
        .poll_interval_secs
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_METRICS_POLL_INTERVAL_SECS);
    telemetry::spawn_stats_collector(stats, Duration::from_secs(poll_interval));
    Ok(())
}
