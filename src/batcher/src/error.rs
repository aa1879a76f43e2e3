/// Errors surfaced by a [`crate::Batcher`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BatcherError {
    /// Rejected at construction time, before the run loop starts.
    #[error("invalid batcher configuration: {0}")]
    InvalidConfiguration(String),
    /// The batch receiver was dropped while a batch was being delivered.
    #[error("batch output closed, dropped {dropped} buffered items")]
    OutputClosed { dropped: usize },
}
