//! Progress reporting for pipeline stages.
//!
//! The loader and the generation pipeline report through
//! [`ProgressCallback`] so that the rendering backend (an `indicatif` bar in
//! the CLI, nothing at all in tests) stays a caller decision.

use std::sync::Arc;

/// Receives progress updates from long-running stages.
///
/// Implementations must be `Send + Sync` because view builders report from
/// blocking worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Updates the message shown alongside the indicator.
    fn set_message(&self, msg: String);

    /// Marks progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
