//! Transfer progress observation.

/// Receives progress of a single transfer.
///
/// Implementations are called from the transfer loop and must return
/// promptly; they observe the transfer and cannot influence it.
pub trait ProgressSink: Send + Sync {
    /// The transfer started. `total` is `None` when the size is unknown.
    fn start(&self, total: Option<u64>);

    /// `transferred` bytes have been written so far.
    fn advance(&self, transferred: u64);

    /// The transfer completed.
    fn finish(&self);

    /// The transfer failed.
    fn abandon(&self);
}

/// A sink that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: Option<u64>) {}

    fn advance(&self, _transferred: u64) {}

    fn finish(&self) {}

    fn abandon(&self) {}
}
