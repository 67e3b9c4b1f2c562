//! Rendering a page tree into a mirrored directory hierarchy.
//!
//! ## Layout
//!
//! ```text
//! output/
//! ├── 1. Root/              ← branch page: a directory …
//! │   ├── 1. Root.docx      ← … holding the branch's own document
//! │   ├── 1. Child.docx     ← leaf pages share their parent's directory
//! │   └── 2. Section/
//! │       └── 2. Section.docx
//! └── 2. Other.docx
//! ```
//!
//! ## Concurrency
//!
//! The walk fans out over siblings and, for a branch, runs the branch's own
//! job alongside its children. Every job passes through one shared
//! [`ConversionQueue`], so no more than its capacity run at once no matter how
//! wide the tree is. A branch directory is created before anything inside it
//! is scheduled.
//!
//! A job takes its queue permit before it is spawned, so admission follows
//! the order the walk schedules jobs in. When one fails nothing new is
//! admitted: jobs still waiting for a permit are dropped, and `render_pages`
//! waits for the jobs already running before it returns the first error.

use crate::converter::DocumentConverter;
use crate::error::{MigrateError, Result};
use crate::fs;
use crate::page::{count_pages, Page};
use crate::progress::ProgressCallback;
use crate::queue::{ConversionQueue, JobState};
use crate::source::PageReader;
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, info, warn};

/// Writes a page forest below a base directory.
#[async_trait]
pub trait PageExporter: Send + Sync {
    /// Fail early if rendering cannot work at all (e.g. no converter installed).
    ///
    /// Called by the pipeline before it clears the output directory.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn render_pages(&self, pages: &[Page], base_dir: &Path) -> Result<()>;
}

/// Exporter that reads each page, converts it, and writes
/// `<dir>/<page name>.<output_extension>`.
#[derive(Clone)]
pub struct DocumentPageExporter {
    inner: Arc<ExporterInner>,
}

struct ExporterInner {
    reader: Arc<dyn PageReader>,
    converter: Arc<dyn DocumentConverter>,
    queue: ConversionQueue,
    output_extension: String,
    progress: Option<ProgressCallback>,
}

/// State for one `render_pages` call, shared by its jobs.
struct RenderRun {
    exporter: Arc<ExporterInner>,
    completed: AtomicUsize,
}

impl DocumentPageExporter {
    pub fn new(
        reader: Arc<dyn PageReader>,
        converter: Arc<dyn DocumentConverter>,
        queue: ConversionQueue,
        output_extension: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ExporterInner {
                reader,
                converter,
                queue,
                output_extension: output_extension.into(),
                progress: None,
            }),
        }
    }

    /// Attach a progress callback. The queue stays shared with `self`.
    pub fn with_progress(self, progress: ProgressCallback) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ExporterInner {
                reader: Arc::clone(&inner.reader),
                converter: Arc::clone(&inner.converter),
                queue: inner.queue.clone(),
                output_extension: inner.output_extension.clone(),
                progress: Some(progress),
            }),
        }
    }
}

#[async_trait]
impl PageExporter for DocumentPageExporter {
    async fn render_pages(&self, pages: &[Page], base_dir: &Path) -> Result<()> {
        let start = Instant::now();
        fs::ensure_dir(base_dir).await?;

        let total = count_pages(pages);
        let run = Arc::new(RenderRun {
            exporter: Arc::clone(&self.inner),
            completed: AtomicUsize::new(0),
        });
        info!(
            "Rendering {} pages into {} with {} ({} concurrent)",
            total,
            base_dir.display(),
            self.inner.converter.name(),
            self.inner.queue.capacity()
        );
        if let Some(ref cb) = self.inner.progress {
            cb.on_render_start(total);
        }

        let result = try_join_all(
            pages
                .iter()
                .map(|page| walk(Arc::clone(&run), page, base_dir.to_path_buf())),
        )
        .await
        .map(|_| ());

        if result.is_err() {
            // Let running conversions finish writing before reporting.
            self.inner.queue.drained().await?;
        }

        let completed = run.completed.load(Ordering::SeqCst);
        if let Some(ref cb) = self.inner.progress {
            cb.on_render_complete(total, completed);
        }
        match &result {
            Ok(()) => info!(
                "Rendered {}/{} pages in {}ms",
                completed,
                total,
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("Render aborted after {}/{} pages: {}", completed, total, e),
        }
        result
    }
}

/// Schedule `page` (and, for a branch, its subtree) below `dir`.
fn walk<'a>(run: Arc<RenderRun>, page: &'a Page, dir: PathBuf) -> BoxFuture<'a, Result<()>> {
    async move {
        if !page.is_branch() {
            return schedule(run, job_page(page), dir).await;
        }

        let nested = dir.join(page.output_name());
        fs::ensure_dir(&nested).await?;

        let own = schedule(Arc::clone(&run), job_page(page), nested.clone());
        let children = try_join_all(
            page.children
                .iter()
                .map(|child| walk(Arc::clone(&run), child, nested.clone())),
        );
        futures::try_join!(own, children)?;
        Ok(())
    }
    .boxed()
}

/// The page without its subtree; all a job needs.
fn job_page(page: &Page) -> Page {
    Page::new(page.name.clone(), page.id.clone(), page.file.clone())
}

/// Wait for a queue permit, then spawn one conversion job and wait for it.
async fn schedule(run: Arc<RenderRun>, page: Page, dir: PathBuf) -> Result<()> {
    let name = page.name.clone();
    debug!(page = %name, state = ?JobState::Pending, "queued");
    let permit = run.exporter.queue.admit().await?;
    let handle = tokio::spawn(async move { run.execute(page, dir, permit).await });
    handle
        .await
        .map_err(|e| MigrateError::Internal(format!("conversion job for '{name}' panicked: {e}")))?
}

impl RenderRun {
    /// Runs while holding `_permit`; it is released when the job ends.
    async fn execute(
        &self,
        page: Page,
        dir: PathBuf,
        _permit: OwnedSemaphorePermit,
    ) -> Result<()> {
        let exporter = &self.exporter;
        debug!(page = %page.name, state = ?JobState::Running, "admitted");
        if let Some(ref cb) = exporter.progress {
            cb.on_page_start(&page.name);
        }

        match self.convert_page(&page, &dir).await {
            Ok(bytes) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                debug!(page = %page.name, state = ?JobState::Completed, bytes, "written");
                if let Some(ref cb) = exporter.progress {
                    cb.on_page_complete(&page.name, bytes);
                }
                Ok(())
            }
            Err(e) => {
                warn!(page = %page.name, state = ?JobState::Failed, "{}", e);
                if let Some(ref cb) = exporter.progress {
                    cb.on_page_error(&page.name, &e.to_string());
                }
                Err(MigrateError::RenderFailed {
                    page: page.name.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Read → convert → write. Returns the size of the written document.
    async fn convert_page(&self, page: &Page, dir: &Path) -> Result<usize> {
        let exporter = &self.exporter;
        let content = exporter.reader.read_page(page).await?;
        let converted = exporter.converter.convert(&content).await?;
        let extension = if exporter.converter.keeps_source_format() {
            content
                .file_extension()
                .unwrap_or(exporter.output_extension.as_str())
        } else {
            exporter.output_extension.as_str()
        };
        let target = dir.join(format!("{}.{}", page.output_name(), extension));
        fs::write_file(&target, &converted).await?;
        Ok(converted.len())
    }
}
