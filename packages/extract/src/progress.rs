//! Progress reporting for slow extraction calls.
//!
//! [`ProgressCallback`] keeps extractors independent of how progress is
//! rendered. The CLI plugs in `indicatif` bars; library callers and tests
//! use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from an extractor.
///
/// Implementations must be `Send + Sync` so extraction can run on a
/// blocking worker thread.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete and remove the indicator.
    fn finish_and_clear(&self);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
