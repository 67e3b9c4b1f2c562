//! Error types for the confluence-migrate library.
//!
//! Every fatal condition is a variant of [`MigrateError`]. Variants are grouped
//! by how they arise:
//!
//! * **Structural** — the export index is missing or malformed. Nothing can be
//!   listed, rendered or synchronised without a page tree.
//! * **I/O** — a page's source document or an output path could not be read
//!   or written.
//! * **Converter** — the external binary could not be found, or it ran and
//!   reported a failure.
//! * **Remote** — the Confluence API refused or failed a download.
//!
//! Nothing in the core retries. A single failing page fails the enclosing bulk
//! operation, and the error carries the page and path that caused it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the confluence-migrate library.
#[derive(Debug, Error)]
pub enum MigrateError {
    // ── Structural errors ─────────────────────────────────────────────────
    /// The export directory has no navigation index.
    #[error("Export index not found: '{path}'\nCheck ATLASSIAN_EXPORT_PATH points at an unpacked HTML export.")]
    IndexNotFound { path: PathBuf },

    /// The index exists but does not describe a page tree.
    #[error("Invalid export index: {detail}")]
    MalformedIndex { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The source document for a scheduled page does not exist.
    #[error("Source document for page '{page}' not found at '{path}'")]
    PageNotFound { page: String, path: PathBuf },

    /// Any other filesystem failure, with the path that caused it.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Converter errors ──────────────────────────────────────────────────
    /// The converter binary is not installed where we looked.
    #[error("{converter} is not available. Searched: {}\nInstall it or point the environment override at the binary.", searched.join(", "))]
    ConverterUnavailable {
        converter: String,
        searched: Vec<String>,
    },

    /// The converter ran but failed (non-zero exit, stderr output, no result file).
    #[error("{converter} conversion failed: {detail}")]
    ConversionFailed { converter: String, detail: String },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Downloading a page from Confluence failed.
    #[error("Failed to download page '{page}': {reason}")]
    DownloadFailed { page: String, reason: String },

    /// The configured source cannot perform the requested operation.
    #[error("Operation not supported by this page source: {operation}")]
    Unsupported { operation: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// A single conversion job failed; wraps the underlying cause.
    #[error("Rendering page '{page}' failed: {source}")]
    RenderFailed {
        page: String,
        #[source]
        source: Box<MigrateError>,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MigrateError {
    /// Attach a path to an [`std::io::Error`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = MigrateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_not_found_names_page_and_path() {
        let e = MigrateError::PageNotFound {
            page: "1. Root".into(),
            path: PathBuf::from("/export/Root_1.html"),
        };
        let msg = e.to_string();
        assert!(msg.contains("1. Root"), "got: {msg}");
        assert!(msg.contains("/export/Root_1.html"), "got: {msg}");
    }

    #[test]
    fn converter_unavailable_lists_searched_paths() {
        let e = MigrateError::ConverterUnavailable {
            converter: "pandoc".into(),
            searched: vec!["$PANDOC_EXE".into(), "/usr/bin/pandoc".into()],
        };
        let msg = e.to_string();
        assert!(msg.starts_with("pandoc is not available"), "got: {msg}");
        assert!(msg.contains("/usr/bin/pandoc"));
    }

    #[test]
    fn render_failed_keeps_inner_cause() {
        let e = MigrateError::RenderFailed {
            page: "Child".into(),
            source: Box::new(MigrateError::ConversionFailed {
                converter: "pandoc".into(),
                detail: "exit status 1".into(),
            }),
        };
        assert!(e.to_string().contains("Child"));
        assert!(e.to_string().contains("exit status 1"));
    }
}
