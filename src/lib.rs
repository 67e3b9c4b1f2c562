//! # confluence-migrate
//!
//! Migrate a Confluence space, exported as HTML, into a folder hierarchy of
//! Word documents with each page's attachments alongside.
//!
//! ## Why this crate?
//!
//! Confluence organises pages as a tree; a file share organises documents as
//! folders. The HTML export already holds every page and attachment, but as a
//! flat directory with the hierarchy encoded only in `index.html`. This crate
//! recovers the tree, converts each page with an office converter, and writes
//! it back out as nested directories a user can browse.
//!
//! ## Pipeline Overview
//!
//! ```text
//! export/index.html
//!  │
//!  ├─ 1. List     parse the navigation index into a page tree (cached)
//!  ├─ 2. Download optional: fetch each page from /wiki/exportword
//!  ├─ 3. Render   clear output/, convert every page through a bounded queue
//!  └─ 4. Sync     copy export/attachments/<id>/ next to each page
//! ```
//!
//! A branch page becomes a directory holding its own document plus its
//! children; a leaf becomes a single document in its parent's directory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use confluence_migrate::{ConverterKind, ExportPipeline, MigrationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::builder()
//!         .export_path("confluence-export")
//!         .output_path("output")
//!         .converter(ConverterKind::LibreOffice)
//!         .build()?;
//!
//!     let pipeline = ExportPipeline::from_config(&config)?;
//!     pipeline.render_pages(None).await?;
//!     pipeline.sync_attachments().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ctogdm` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! confluence-migrate = { version = "0.1", default-features = false }
//! ```
//!
//! ## Converters
//!
//! | Converter | Binary | Override | Notes |
//! |-----------|--------|----------|-------|
//! | LibreOffice (default) | `soffice` | `LIBRE_OFFICE_EXE` | HTML import filter for export pages, format detection for downloads, isolated profile per job |
//! | Pandoc | `pandoc` | `PANDOC_EXE` | resolves images against the export root |
//! | Passthrough | none | | copies bytes and keeps the source extension (`.html`, `.doc`) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod converter;
pub mod error;
pub mod exporter;
pub mod fs;
pub mod page;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterKind, MigrationConfig, MigrationConfigBuilder, RenderSource};
pub use converter::{
    build_converter, DocumentConverter, LibreOfficeConverter, PandocConverter,
    PassthroughConverter,
};
pub use error::{MigrateError, Result};
pub use exporter::{DocumentPageExporter, PageExporter};
pub use page::{count_pages, format_page_tree, Page};
pub use pipeline::{ExportPipeline, PipelineOptions};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
pub use queue::{ConversionQueue, JobState};
pub use source::{
    parse_index, DownloadedPageReader, ExportSourceOptions, HtmlExportSource, HtmlPageReader,
    PageContent, PageReader, PageTreeSource,
};
