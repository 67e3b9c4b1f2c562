//! Document converters: page bytes in, output document bytes out.
//!
//! Real conversions shell out to an external program. Each converter writes
//! its input into a scoped [`tempfile::TempDir`], runs the binary, and reads
//! the produced file back. The temp directory is removed when it drops, so
//! success, failure, and panic paths all clean up.
//!
//! 1. [`libreoffice`] — `soffice --headless --convert-to docx` (default); reads
//!    export HTML and downloaded Word documents
//! 2. [`pandoc`]      — `pandoc --from html --to docx`, resolving images via
//!    `--resource-path`
//! 3. [`PassthroughConverter`] — no conversion; pages are copied in their
//!    source format and keep its extension
//!
//! [`binary`] finds the executables.

pub mod binary;
pub mod libreoffice;
pub mod pandoc;

pub use binary::BinaryLocator;
pub use libreoffice::LibreOfficeConverter;
pub use pandoc::PandocConverter;

use crate::config::{ConverterKind, RenderSource};
use crate::error::Result;
use crate::source::PageContent;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Prefix for converter temp directories.
pub const TEMP_PREFIX: &str = "ctogdm-";

/// Transforms raw page content into the output document format.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, content: &PageContent) -> Result<Vec<u8>>;

    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// `true` when the output is still in the input's format, so the written
    /// file keeps the source extension instead of the configured one.
    fn keeps_source_format(&self) -> bool {
        false
    }
}

/// Returns the page bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConverter;

#[async_trait]
impl DocumentConverter for PassthroughConverter {
    async fn convert(&self, content: &PageContent) -> Result<Vec<u8>> {
        Ok(content.bytes.clone())
    }

    fn name(&self) -> &str {
        "passthrough"
    }

    fn keeps_source_format(&self) -> bool {
        true
    }
}

/// Build the converter selected by `kind` for pages read from `source`,
/// locating its binary now.
///
/// Binary discovery happens once here so a missing installation fails before
/// the output directory is cleared. Downloaded pages are Word documents, so
/// LibreOffice detects their format instead of forcing the HTML filter.
pub fn build_converter(
    kind: ConverterKind,
    source: RenderSource,
) -> Result<Arc<dyn DocumentConverter>> {
    let converter: Arc<dyn DocumentConverter> = match kind {
        ConverterKind::LibreOffice => {
            let soffice = LibreOfficeConverter::discover()?;
            match source {
                RenderSource::Export => Arc::new(soffice),
                RenderSource::Downloaded => Arc::new(soffice.detect_input_format()),
            }
        }
        ConverterKind::Pandoc => Arc::new(PandocConverter::discover()?),
        ConverterKind::Passthrough => Arc::new(PassthroughConverter),
    };
    info!("Using {} converter", converter.name());
    Ok(converter)
}

/// File name for the temp input: the page's own name when known, else `fallback`.
fn input_file_name(content: &PageContent, fallback: &str) -> String {
    content
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Summarise a process's stderr for an error message.
fn stderr_summary(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.chars().count() > 500 {
        let head: String = text.chars().take(499).collect();
        format!("{head}\u{2026}")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_returns_input() {
        let out = PassthroughConverter
            .convert(&PageContent::from_bytes(b"docx bytes".to_vec()))
            .await
            .unwrap();
        assert_eq!(out, b"docx bytes");
    }

    #[test]
    fn input_name_uses_basename() {
        let mut content = PageContent::from_bytes(Vec::new());
        assert_eq!(input_file_name(&content, "source.html"), "source.html");
        content.file_name = Some("nested/Page_123.html".into());
        assert_eq!(input_file_name(&content, "source.html"), "Page_123.html");
    }

    #[test]
    fn stderr_is_trimmed_and_capped() {
        assert_eq!(stderr_summary(b"  oops \n"), "oops");
        let long = vec![b'x'; 2000];
        assert_eq!(stderr_summary(&long).chars().count(), 500);
    }

    #[test]
    fn passthrough_needs_no_binary() {
        let c = build_converter(ConverterKind::Passthrough, RenderSource::Downloaded).unwrap();
        assert_eq!(c.name(), "passthrough");
        assert!(c.keeps_source_format());
    }
}
