//! Line pipeline: newline-delimited items in, one JSON array per batch out.

use crate::config::{DEFAULT_BATCHER_ID, DEFAULT_CHANNEL_CAPACITY};
use batcher::{
    count_items, Batcher, BatcherConfig, BatcherError, BatcherExit, BatcherStats,
    BatcherStatsSnapshot,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub batcher_id: String,
    pub batcher: BatcherConfig,
    /// Capacity of both the item channel and the batch channel.
    pub channel_capacity: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            batcher_id: DEFAULT_BATCHER_ID.to_string(),
            batcher: BatcherConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Outcome of [`LinePipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub exit: BatcherExit,
    pub lines_read: u64,
    pub batches_written: u64,
    pub stats: BatcherStatsSnapshot,
}

pub struct LinePipeline {
    batcher: Batcher<String>,
    items: mpsc::Sender<String>,
    batches: mpsc::Receiver<Vec<String>>,
}

impl LinePipeline {
    pub fn new(options: &RunnerOptions) -> Result<Self, BatcherError> {
        if options.channel_capacity == 0 {
            return Err(BatcherError::InvalidConfiguration(
                "channel_capacity must be positive".to_string(),
            ));
        }
        let (items, item_rx) = mpsc::channel(options.channel_capacity);
        let (batch_tx, batches) = mpsc::channel(options.channel_capacity);
        let batcher = Batcher::new(item_rx, options.batcher, count_items, batch_tx)?
            .with_id(options.batcher_id.clone());
        Ok(Self {
            batcher,
            items,
            batches,
        })
    }

    /// Live counters of the underlying batcher, usable while `run` is active.
    pub fn stats(&self) -> Arc<BatcherStats> {
        self.batcher.stats()
    }

    /// Read lines from `reader` until EOF or `cancel`, writing each batch to
    /// `writer` as a JSON array followed by a newline. Blank lines are skipped.
    pub async fn run<R, W>(
        self,
        reader: R,
        writer: W,
        cancel: CancellationToken,
    ) -> Result<RunReport, BoxError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            mut batcher,
            items,
            batches,
        } = self;
        let stats = batcher.stats();
        let reader_task = tokio::spawn(read_lines(reader, items, cancel.clone()));
        let writer_task = tokio::spawn(write_batches(writer, batches));

        let exit = batcher.run(&cancel).await;
        // Releases the batch sender so the writer drains and stops.
        drop(batcher);

        // A failed writer drops its receiver, which the batcher only sees as a
        // closed output; report the writer's own error instead.
        let written = writer_task.await?;
        let (exit, batches_written) = match (exit, written) {
            (Ok(exit), written) => (exit, written?),
            (Err(err), Err(write_err)) => {
                tracing::debug!(error = %err, "batcher stopped after writer failure");
                return Err(write_err);
            }
            (Err(err), Ok(_)) => return Err(err.into()),
        };
        let lines_read = reader_task.await??;
        Ok(RunReport {
            exit,
            lines_read,
            batches_written,
            stats: stats.snapshot(),
        })
    }
}

/// Convenience wrapper for callers that do not need a live stats handle.
pub async fn run_lines<R, W>(
    reader: R,
    writer: W,
    options: &RunnerOptions,
    cancel: CancellationToken,
) -> Result<RunReport, BoxError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    LinePipeline::new(options)?
        .run(reader, writer, cancel)
        .await
}

async fn read_lines<R>(
    mut reader: R,
    items: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> Result<u64, BoxError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut read = 0;
    loop {
        buf.clear();
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            n = reader.read_until(b'\n', &mut buf) => n?,
        };
        if n == 0 {
            tracing::debug!(lines = read, "input reached end of stream");
            break;
        }
        let line = decode_line(&buf);
        if line.trim().is_empty() {
            continue;
        }
        if items.send(line).await.is_err() {
            break;
        }
        read += 1;
    }
    Ok(read)
}

/// Strip the line terminator; invalid UTF-8 is replaced rather than ending the stream.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match std::str::from_utf8(raw) {
        Ok(line) => line.to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "input line is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

async fn write_batches<W>(
    mut writer: W,
    mut batches: mpsc::Receiver<Vec<String>>,
) -> Result<u64, BoxError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(batch) = batches.recv().await {
        let mut encoded = serde_json::to_vec(&batch)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        written += 1;
    }
    writer.shutdown().await?;
    Ok(written)
}
