//! Page tree from a Confluence HTML export, downloads from the live site.
//!
//! ## Index layout
//!
//! The export's `index.html` encodes the space as nested lists. Every `<ul>`
//! holds exactly one `<li>`; that `<li>` carries the page link and zero or more
//! child `<ul>` elements, one per child page:
//!
//! ```text
//! <ul><li><a href="index.html">Space home</a>
//!     <ul><li><a href="Root_1.html">Root</a>
//!         <ul><li><a href="Child_2.html">Child</a></li></ul>
//!     </li></ul>
//! </li></ul>
//! ```
//!
//! The outermost list item is the space home; its children are the forest we
//! return. The page id is recovered from the link (`Child_2.html` → `2`) and is
//! the only key tying a page to its attachment folder and remote document.

use super::PageTreeSource;
use crate::error::{MigrateError, Result};
use crate::page::{extract_page_id, Page};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

static UL: Lazy<Selector> = Lazy::new(|| Selector::parse("ul").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// Settings for [`HtmlExportSource`].
#[derive(Debug, Clone)]
pub struct ExportSourceOptions {
    /// Root of the unpacked export (contains `index.html` and `attachments/`).
    pub export_path: PathBuf,
    /// Confluence site for downloads. Empty disables [`PageTreeSource::download_page`].
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    /// Per-request timeout for downloads.
    pub timeout_secs: u64,
}

impl ExportSourceOptions {
    /// Options for a purely local export, without download credentials.
    pub fn local(export_path: impl Into<PathBuf>) -> Self {
        Self {
            export_path: export_path.into(),
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            timeout_secs: 120,
        }
    }
}

/// Page-tree source backed by an HTML export bundle.
pub struct HtmlExportSource {
    options: ExportSourceOptions,
    index_path: PathBuf,
    http: reqwest::Client,
}

impl HtmlExportSource {
    pub fn new(options: ExportSourceOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| MigrateError::Internal(format!("HTTP client: {e}")))?;
        let index_path = options.export_path.join("index.html");
        Ok(Self {
            options,
            index_path,
            http,
        })
    }

    /// `{base_url}/wiki/exportword?pageId={id}`
    fn export_word_url(&self, page: &Page) -> Result<Url> {
        let failed = |reason: String| MigrateError::DownloadFailed {
            page: page.name.clone(),
            reason,
        };
        if self.options.base_url.is_empty() {
            return Err(failed(
                "no Confluence base URL configured (set ATLASSIAN_BASE_URL)".into(),
            ));
        }
        let base = Url::parse(&self.options.base_url)
            .map_err(|e| failed(format!("invalid base URL '{}': {e}", self.options.base_url)))?;
        let mut url = base
            .join("/wiki/exportword")
            .map_err(|e| failed(e.to_string()))?;
        url.query_pairs_mut().append_pair("pageId", &page.id);
        Ok(url)
    }
}

#[async_trait]
impl PageTreeSource for HtmlExportSource {
    async fn get_page_tree(&self) -> Result<Vec<Page>> {
        let html = match tokio::fs::read_to_string(&self.index_path).await {
            Ok(html) => html,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MigrateError::IndexNotFound {
                    path: self.index_path.clone(),
                });
            }
            Err(e) => return Err(MigrateError::io(&self.index_path, e)),
        };

        let pages = parse_index(&html)?;
        info!(
            "Parsed {} root pages from {}",
            pages.len(),
            self.index_path.display()
        );
        Ok(pages)
    }

    fn attachments_directory(&self) -> Option<PathBuf> {
        Some(self.options.export_path.join("attachments"))
    }

    async fn download_page(&self, page: &Page) -> Result<Vec<u8>> {
        let url = self.export_word_url(page)?;
        let failed = |reason: String| MigrateError::DownloadFailed {
            page: page.name.clone(),
            reason,
        };
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .basic_auth(&self.options.email, Some(&self.options.api_token))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failed(format!("timed out after {}s", self.options.timeout_secs))
                } else {
                    failed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Parse the export's `index.html` into the ordered page forest.
///
/// Fails with [`MigrateError::MalformedIndex`] when the list container,
/// a list item, or a page link is missing.
pub fn parse_index(html: &str) -> Result<Vec<Page>> {
    let document = Html::parse_document(html);
    let root = document
        .select(&UL)
        .next()
        .ok_or_else(|| MigrateError::MalformedIndex {
            detail: "missing list container element".into(),
        })?;

    Ok(parse_list(root, 0)?.children)
}

fn parse_list(ul: ElementRef<'_>, index: usize) -> Result<Page> {
    let li = ul
        .children()
        .filter_map(ElementRef::wrap)
        .next()
        .ok_or_else(|| MigrateError::MalformedIndex {
            detail: "missing list item element".into(),
        })?;

    let anchor = li
        .select(&ANCHOR)
        .next()
        .ok_or_else(|| MigrateError::MalformedIndex {
            detail: "missing anchor element".into(),
        })?;

    let href = anchor.value().attr("href").unwrap_or_default();
    let title: String = anchor.text().collect();

    let children = li
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "ul")
        .enumerate()
        .map(|(child_index, child)| parse_list(child, child_index))
        .collect::<Result<Vec<_>>>()?;

    Ok(Page {
        name: format!("{}. {}", index + 1, title.trim()),
        id: extract_page_id(href),
        file: href.to_string(),
        children,
    })
}
