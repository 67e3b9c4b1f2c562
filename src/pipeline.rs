//! The export pipeline: list, download, render and attachment sync.
//!
//! ```text
//! PageTreeSource ──▶ list_pages (cached)
//!                      ├─▶ download_pages    sequential, fail-fast
//!                      ├─▶ render_pages      clear output, PageExporter
//!                      └─▶ sync_attachments  copy <attachments>/<id> per page
//! ```
//!
//! The tree is fetched from the source once per pipeline and shared behind an
//! `Arc`; every operation after that walks the same instance.

use crate::config::{MigrationConfig, RenderSource};
use crate::converter::build_converter;
use crate::error::{MigrateError, Result};
use crate::exporter::{DocumentPageExporter, PageExporter};
use crate::fs;
use crate::page::Page;
use crate::progress::ProgressCallback;
use crate::queue::ConversionQueue;
use crate::source::{
    DownloadedPageReader, ExportSourceOptions, HtmlExportSource, HtmlPageReader, PageReader,
    PageTreeSource,
};
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Paths and names the pipeline writes to.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root of the rendered hierarchy; removed at the start of every render.
    pub output_dir: PathBuf,
    /// Where downloaded documents are written.
    pub download_dir: PathBuf,
    pub download_extension: String,
    /// One folder per page id. `None` makes `sync_attachments` a no-op.
    pub attachments_source_dir: Option<PathBuf>,
    pub attachments_folder_name: String,
}

impl PipelineOptions {
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            output_dir: config.output_path.clone(),
            download_dir: config.download_path.clone(),
            download_extension: config.download_extension.clone(),
            attachments_source_dir: Some(config.attachments_source_dir()),
            attachments_folder_name: config.attachments_folder_name.clone(),
        }
    }
}

/// Orchestrates the migration against a page source and an exporter.
pub struct ExportPipeline {
    source: Arc<dyn PageTreeSource>,
    exporter: Arc<dyn PageExporter>,
    options: PipelineOptions,
    pages: OnceCell<Arc<Vec<Page>>>,
}

impl ExportPipeline {
    pub fn new(
        source: Arc<dyn PageTreeSource>,
        exporter: Arc<dyn PageExporter>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            exporter,
            options,
            pages: OnceCell::new(),
        }
    }

    /// Pipeline over an HTML export, rendering with the configured converter.
    ///
    /// The converter binary is located on the first render, not here, so
    /// `list`, `download` and `attachments` work without one installed.
    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        Self::from_config_with_progress(config, None)
    }

    pub fn from_config_with_progress(
        config: &MigrationConfig,
        progress: Option<ProgressCallback>,
    ) -> Result<Self> {
        let source = HtmlExportSource::new(ExportSourceOptions {
            export_path: config.export_path.clone(),
            base_url: config.base_url.clone(),
            email: config.email.clone(),
            api_token: config.api_token.clone(),
            timeout_secs: config.download_timeout_secs,
        })?;

        let mut options = PipelineOptions::from_config(config);
        options.attachments_source_dir = source.attachments_directory();

        let exporter = ConfiguredExporter {
            config: config.clone(),
            progress,
            inner: OnceCell::new(),
        };
        Ok(Self::new(Arc::new(source), Arc::new(exporter), options))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The page forest, fetched from the source on first call.
    pub async fn list_pages(&self) -> Result<Arc<Vec<Page>>> {
        let pages = self
            .pages
            .get_or_try_init(|| async {
                let tree = self.source.get_page_tree().await?;
                info!(
                    "Loaded page tree: {} top-level, {} total",
                    tree.len(),
                    crate::page::count_pages(&tree)
                );
                Ok::<_, MigrateError>(Arc::new(tree))
            })
            .await?;
        Ok(Arc::clone(pages))
    }

    /// Download every page (parent before children) into the download
    /// directory. Stops at the first failure. Returns the number written.
    pub async fn download_pages(&self, tree: Option<&[Page]>) -> Result<usize> {
        let cached;
        let pages = match tree {
            Some(pages) => pages,
            None => {
                cached = self.list_pages().await?;
                cached.as_slice()
            }
        };

        let start = Instant::now();
        fs::ensure_dir(&self.options.download_dir).await?;

        let mut ordered = Vec::new();
        preorder(pages, &mut ordered);

        for (n, page) in ordered.iter().enumerate() {
            let bytes = self.source.download_page(page).await?;
            let path = DownloadedPageReader::document_path(
                &self.options.download_dir,
                page,
                &self.options.download_extension,
            );
            fs::write_file(&path, &bytes).await?;
            debug!(
                "[{}/{}] {} → {} ({} bytes)",
                n + 1,
                ordered.len(),
                page.name,
                path.display(),
                bytes.len()
            );
        }

        info!(
            "Downloaded {} pages to {} in {}ms",
            ordered.len(),
            self.options.download_dir.display(),
            start.elapsed().as_millis()
        );
        Ok(ordered.len())
    }

    /// Clear the output directory and render the tree into it.
    pub async fn render_pages(&self, tree: Option<&[Page]>) -> Result<()> {
        let cached;
        let pages = match tree {
            Some(pages) => pages,
            None => {
                cached = self.list_pages().await?;
                cached.as_slice()
            }
        };

        self.exporter.prepare().await?;
        debug!("Clearing {}", self.options.output_dir.display());
        fs::remove_dir_all_if_exists(&self.options.output_dir).await?;
        self.exporter
            .render_pages(pages, &self.options.output_dir)
            .await
    }

    /// Copy each page's attachment folder next to its rendered document.
    /// Returns the number of folders copied.
    pub async fn sync_attachments(&self) -> Result<usize> {
        let Some(root) = self.options.attachments_source_dir.as_deref() else {
            debug!("No attachment directory configured; nothing to sync");
            return Ok(0);
        };

        let pages = self.list_pages().await?;
        let copied = AtomicUsize::new(0);
        try_join_all(pages.iter().map(|page| {
            self.sync_page(page, root, self.options.output_dir.clone(), &copied)
        }))
        .await?;

        let copied = copied.into_inner();
        info!(
            "Synced {} attachment folders from {}",
            copied,
            root.display()
        );
        Ok(copied)
    }

    fn sync_page<'a>(
        &'a self,
        page: &'a Page,
        root: &'a Path,
        dir: PathBuf,
        copied: &'a AtomicUsize,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let page_dir = if page.is_branch() {
                dir.join(page.output_name())
            } else {
                dir
            };

            // An empty id would name the attachment root itself.
            if !page.id.is_empty() {
                let source = root.join(&page.id);
                if fs::path_exists(&source).await {
                    let destination = page_dir
                        .join(&self.options.attachments_folder_name)
                        .join(&page.id);
                    fs::remove_dir_all_if_exists(&destination).await?;
                    fs::copy_dir_all(&source, &destination).await?;
                    copied.fetch_add(1, Ordering::SeqCst);
                    debug!("{} → {}", source.display(), destination.display());
                }
            }

            try_join_all(
                page.children
                    .iter()
                    .map(|child| self.sync_page(child, root, page_dir.clone(), copied)),
            )
            .await?;
            Ok(())
        }
        .boxed()
    }
}

fn preorder<'a>(pages: &'a [Page], out: &mut Vec<&'a Page>) {
    for page in pages {
        out.push(page);
        preorder(&page.children, out);
    }
}

/// Exporter assembled from a [`MigrationConfig`] on first use.
struct ConfiguredExporter {
    config: MigrationConfig,
    progress: Option<ProgressCallback>,
    inner: OnceCell<DocumentPageExporter>,
}

impl ConfiguredExporter {
    async fn get(&self) -> Result<&DocumentPageExporter> {
        self.inner
            .get_or_try_init(|| async {
                let config = &self.config;
                let reader: Arc<dyn PageReader> = match config.render_source {
                    RenderSource::Export => Arc::new(HtmlPageReader::new(&config.export_path)),
                    RenderSource::Downloaded => Arc::new(DownloadedPageReader::new(
                        &config.download_path,
                        &config.download_extension,
                    )),
                };
                let converter = build_converter(config.converter, config.render_source)?;
                let queue = ConversionQueue::new(config.conversion_concurrency)?;

                let exporter = DocumentPageExporter::new(
                    reader,
                    converter,
                    queue,
                    &config.output_extension,
                );
                Ok::<_, MigrateError>(match self.progress {
                    Some(ref cb) => exporter.with_progress(Arc::clone(cb)),
                    None => exporter,
                })
            })
            .await
    }
}

#[async_trait]
impl PageExporter for ConfiguredExporter {
    async fn prepare(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }

    async fn render_pages(&self, pages: &[Page], base_dir: &Path) -> Result<()> {
        self.get().await?.render_pages(pages, base_dir).await
    }
}
