//! Progress-callback trait for per-page render events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::exporter::DocumentPageExporter::with_progress`] to receive events
//! as conversion jobs move through the queue. The CLI uses this to drive its
//! progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use confluence_migrate::RenderProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, name: &str, bytes: usize) {
//!         let done = self.written.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{done} {name}: {bytes} bytes");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the exporter as it renders each page.
///
/// Jobs run concurrently, so methods may be called from several tasks at
/// once. All methods default to no-ops.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once before any job is scheduled.
    ///
    /// # Arguments
    /// * `total_pages` — number of conversion jobs the tree will produce
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a job is admitted by the queue (`Pending` → `Running`).
    fn on_page_start(&self, name: &str) {
        let _ = name;
    }

    /// Called after a page's document has been written.
    ///
    /// # Arguments
    /// * `name`  — page name
    /// * `bytes` — size of the written document
    fn on_page_complete(&self, name: &str, bytes: usize) {
        let _ = (name, bytes);
    }

    /// Called when reading, converting or writing a page failed.
    fn on_page_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once when the render call returns, successful or not.
    ///
    /// # Arguments
    /// * `total_pages`   — jobs scheduled
    /// * `success_count` — jobs that had completed by then
    fn on_render_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl RenderProgressCallback for TrackingCallback {
        fn on_page_start(&self, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _name: &str, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_render_complete(&self, _total_pages: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_render_start(5);
        cb.on_page_start("1. Root");
        cb.on_page_complete("1. Root", 42);
        cb.on_page_error("Child", "missing");
        cb.on_render_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start("a");
        tracker.on_page_complete("a", 10);
        tracker.on_page_start("b");
        tracker.on_page_error("b", "converter failed");
        tracker.on_render_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 1);
    }
}
