//! Page-tree sources and page content readers.
//!
//! The pipeline never touches a concrete backend: it is written against
//! [`PageTreeSource`] (where the tree and attachments come from) and
//! [`PageReader`] (where a page's bytes come from). Tests substitute
//! in-memory doubles for both.
//!
//! 1. [`export`] — parse `index.html` of an HTML export; download pages from
//!    the Confluence `exportword` endpoint
//! 2. [`reader`] — read page bytes from the export bundle or from the
//!    download directory

pub mod export;
pub mod reader;

pub use export::{parse_index, ExportSourceOptions, HtmlExportSource};
pub use reader::{DownloadedPageReader, HtmlPageReader};

use crate::error::{MigrateError, Result};
use crate::page::Page;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Produces the ordered page forest and knows where attachments live.
#[async_trait]
pub trait PageTreeSource: Send + Sync {
    /// Build the page forest. Fails with a structural error on a malformed index.
    async fn get_page_tree(&self) -> Result<Vec<Page>>;

    /// Directory holding one attachment folder per page id, if any.
    fn attachments_directory(&self) -> Option<PathBuf>;

    /// Fetch the raw document for `page` from the remote system.
    async fn download_page(&self, page: &Page) -> Result<Vec<u8>> {
        let _ = page;
        Err(MigrateError::Unsupported {
            operation: "download_page".into(),
        })
    }
}

/// Raw page bytes plus the hints a converter needs to resolve relative resources.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub bytes: Vec<u8>,
    /// Directory that relative references (images, attachments) resolve against.
    pub working_directory: Option<PathBuf>,
    /// Original file name, used to name the converter's temp input.
    pub file_name: Option<String>,
}

impl PageContent {
    /// Content with no resolution hints.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            ..Default::default()
        }
    }

    /// Extension of [`Self::file_name`], e.g. `doc` for `Page_1.doc`.
    pub fn file_extension(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
    }
}

/// Returns the content to convert for a page.
#[async_trait]
pub trait PageReader: Send + Sync {
    async fn read_page(&self, page: &Page) -> Result<PageContent>;
}
