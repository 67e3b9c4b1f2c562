//! Configuration for a migration run.
//!
//! All paths, credentials and tuning knobs live in one [`MigrationConfig`],
//! built once at process start (the CLI maps flags and environment variables
//! onto the builder) and handed by reference to
//! [`crate::pipeline::ExportPipeline::from_config`]. The core never reads the
//! environment itself.

use crate::error::MigrateError;
use std::fmt;
use std::path::PathBuf;

/// Configuration for an export/render/sync run.
///
/// # Example
/// ```rust
/// use confluence_migrate::{ConverterKind, MigrationConfig};
///
/// let config = MigrationConfig::builder()
///     .export_path("confluence-export")
///     .output_path("output")
///     .converter(ConverterKind::Pandoc)
///     .conversion_concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_extension, "docx");
/// ```
#[derive(Clone)]
pub struct MigrationConfig {
    /// Root of the unpacked HTML export (contains `index.html`). Default: `confluence-export`.
    pub export_path: PathBuf,

    /// Where `download` writes fetched documents. Default: `downloaded-pages`.
    pub download_path: PathBuf,

    /// Root of the rendered hierarchy. Cleared by every render. Default: `output`.
    pub output_path: PathBuf,

    /// Confluence site, e.g. `https://example.atlassian.net`. Needed for `download` only.
    pub base_url: String,

    /// Atlassian account e-mail for Basic auth.
    pub email: String,

    /// Atlassian API token for Basic auth.
    pub api_token: String,

    /// Requested conversion concurrency. `None` means one job per CPU.
    ///
    /// Values above the CPU count are clamped down; converters are CPU-bound
    /// external processes.
    pub conversion_concurrency: Option<usize>,

    /// Extension of rendered documents. Default: `docx`.
    pub output_extension: String,

    /// Extension used for downloaded documents. Default: `doc`.
    pub download_extension: String,

    /// Name of the per-directory attachment folder in the output. Default: `attachments`.
    pub attachments_folder_name: String,

    /// Converter used by `render`. Default: [`ConverterKind::LibreOffice`].
    pub converter: ConverterKind,

    /// Where `render` reads page content from. Default: [`RenderSource::Export`].
    pub render_source: RenderSource,

    /// HTTP timeout for a single page download in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("confluence-export"),
            download_path: PathBuf::from("downloaded-pages"),
            output_path: PathBuf::from("output"),
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            conversion_concurrency: None,
            output_extension: "docx".to_string(),
            download_extension: "doc".to_string(),
            attachments_folder_name: "attachments".to_string(),
            converter: ConverterKind::default(),
            render_source: RenderSource::default(),
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("export_path", &self.export_path)
            .field("download_path", &self.download_path)
            .field("output_path", &self.output_path)
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &if self.api_token.is_empty() { "" } else { "<redacted>" })
            .field("conversion_concurrency", &self.conversion_concurrency)
            .field("output_extension", &self.output_extension)
            .field("download_extension", &self.download_extension)
            .field("attachments_folder_name", &self.attachments_folder_name)
            .field("converter", &self.converter)
            .field("render_source", &self.render_source)
            .finish()
    }
}

impl MigrationConfig {
    /// Create a new builder for `MigrationConfig`.
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Attachment root inside the export bundle.
    pub fn attachments_source_dir(&self) -> PathBuf {
        self.export_path.join("attachments")
    }
}

/// Builder for [`MigrationConfig`].
#[derive(Debug)]
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
}

impl MigrationConfigBuilder {
    pub fn export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.export_path = path.into();
        self
    }

    pub fn download_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.download_path = path.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn credentials(mut self, email: impl Into<String>, api_token: impl Into<String>) -> Self {
        self.config.email = email.into();
        self.config.api_token = api_token.into();
        self
    }

    /// Requested concurrency. Zero is rejected by [`Self::build`].
    pub fn conversion_concurrency(mut self, n: usize) -> Self {
        self.config.conversion_concurrency = Some(n);
        self
    }

    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.output_extension = ext.into();
        self
    }

    pub fn download_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.download_extension = ext.into();
        self
    }

    pub fn attachments_folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.attachments_folder_name = name.into();
        self
    }

    pub fn converter(mut self, kind: ConverterKind) -> Self {
        self.config.converter = kind;
        self
    }

    pub fn render_source(mut self, source: RenderSource) -> Self {
        self.config.render_source = source;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MigrationConfig, MigrateError> {
        let c = &self.config;
        if c.conversion_concurrency == Some(0) {
            return Err(MigrateError::InvalidConfig(
                "Conversion concurrency must be ≥ 1".into(),
            ));
        }
        for (field, ext) in [
            ("output extension", &c.output_extension),
            ("download extension", &c.download_extension),
        ] {
            if ext.is_empty() || ext.contains(['/', '\\', '.']) {
                return Err(MigrateError::InvalidConfig(format!(
                    "{field} must be a bare extension like 'docx', got '{ext}'"
                )));
            }
        }
        if c.converter == ConverterKind::Pandoc && c.render_source == RenderSource::Downloaded {
            return Err(MigrateError::InvalidConfig(
                "pandoc reads HTML only; render downloaded Word documents with libreoffice or passthrough".into(),
            ));
        }
        if c.attachments_folder_name.is_empty() || c.attachments_folder_name.contains(['/', '\\']) {
            return Err(MigrateError::InvalidConfig(format!(
                "Attachments folder name must be a single path component, got '{}'",
                c.attachments_folder_name
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which document converter `render` drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConverterKind {
    /// LibreOffice `soffice --headless --convert-to docx` (default).
    #[default]
    LibreOffice,
    /// `pandoc --from html --to docx`, resolving images against the export.
    Pandoc,
    /// Copy bytes unchanged, keeping the source extension.
    Passthrough,
}

/// Where `render` reads each page's content from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderSource {
    /// The HTML files of the export bundle (default).
    #[default]
    Export,
    /// Documents previously fetched by `download`.
    Downloaded,
}
