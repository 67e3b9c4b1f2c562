//! Page content readers.

use super::{PageContent, PageReader};
use crate::error::{MigrateError, Result};
use crate::page::Page;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

async fn read_page_file(page: &Page, path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes for '{}' from {}", bytes.len(), page.name, path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(MigrateError::PageNotFound {
            page: page.name.clone(),
            path: path.to_path_buf(),
        }),
        Err(e) => Err(MigrateError::io(path, e)),
    }
}

/// Reads `<export>/<page.file>` and points converters at the export root, so
/// relative `attachments/<id>/image.png` references resolve.
#[derive(Debug, Clone)]
pub struct HtmlPageReader {
    export_path: PathBuf,
}

impl HtmlPageReader {
    pub fn new(export_path: impl Into<PathBuf>) -> Self {
        Self {
            export_path: export_path.into(),
        }
    }
}

#[async_trait]
impl PageReader for HtmlPageReader {
    async fn read_page(&self, page: &Page) -> Result<PageContent> {
        let path = self.export_path.join(&page.file);
        let bytes = read_page_file(page, &path).await?;
        let file_name = Path::new(&page.file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        Ok(PageContent {
            bytes,
            working_directory: Some(self.export_path.clone()),
            file_name,
        })
    }
}

/// Reads documents fetched by `download`: `<download_dir>/<file base>.<extension>`.
#[derive(Debug, Clone)]
pub struct DownloadedPageReader {
    download_dir: PathBuf,
    extension: String,
}

impl DownloadedPageReader {
    pub fn new(download_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            extension: extension.into(),
        }
    }

    /// Location `download` writes `page` to; shared with the pipeline.
    pub fn document_path(download_dir: &Path, page: &Page, extension: &str) -> PathBuf {
        download_dir.join(format!("{}.{}", page.file_base_name(), extension))
    }
}

#[async_trait]
impl PageReader for DownloadedPageReader {
    async fn read_page(&self, page: &Page) -> Result<PageContent> {
        let path = Self::document_path(&self.download_dir, page, &self.extension);
        let bytes = read_page_file(page, &path).await?;
        Ok(PageContent {
            bytes,
            working_directory: Some(self.download_dir.clone()),
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn html_reader_sets_resolution_hints() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Root_1.html"), "<p>root</p>").unwrap();

        let reader = HtmlPageReader::new(tmp.path());
        let content = reader
            .read_page(&Page::new("1. Root", "1", "Root_1.html"))
            .await
            .unwrap();

        assert_eq!(content.bytes, b"<p>root</p>");
        assert_eq!(content.working_directory.as_deref(), Some(tmp.path()));
        assert_eq!(content.file_name.as_deref(), Some("Root_1.html"));
    }

    #[tokio::test]
    async fn missing_page_names_page_and_path() {
        let tmp = tempfile::tempdir().unwrap();
        let reader = HtmlPageReader::new(tmp.path());
        let err = reader
            .read_page(&Page::new("1. Ghost", "9", "Ghost_9.html"))
            .await
            .unwrap_err();

        match err {
            MigrateError::PageNotFound { page, path } => {
                assert_eq!(page, "1. Ghost");
                assert_eq!(path, tmp.path().join("Ghost_9.html"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn downloaded_reader_uses_base_name_and_extension() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Child_222.doc"), "child").unwrap();

        let reader = DownloadedPageReader::new(tmp.path(), "doc");
        let content = reader
            .read_page(&Page::new("Child", "222", "Child_222.html"))
            .await
            .unwrap();
        assert_eq!(content.bytes, b"child");
        assert_eq!(content.file_name.as_deref(), Some("Child_222.doc"));
    }
}
