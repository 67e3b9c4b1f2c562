//! CLI binary for confluence-migrate.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `MigrationConfig` and runs one pipeline operation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confluence_migrate::{
    format_page_tree, ConverterKind, ExportPipeline, MigrationConfig, ProgressCallback,
    RenderProgressCallback, RenderSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished page. Pages finish out of
/// order, so timings are keyed by page name.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading export index…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, name: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(name))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_render_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, name: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(name.to_string(), Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_page_complete(&self, name: &str, bytes: usize) {
        let secs = self.elapsed_secs(name);
        self.bar.println(format!(
            "  {} {:<48}  {:<10}  {}",
            green("✓"),
            name,
            dim(&format!("{:>7} B", bytes)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, name: &str, error: &str) {
        let secs = self.elapsed_secs(name);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<48}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_render_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if success_count == total_pages {
            eprintln!(
                "{} {} pages rendered",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} failed)",
                red("✘"),
                bold(&success_count.to_string()),
                total_pages,
                red(&self.errors.load(Ordering::SeqCst).to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show the page tree of an export
  ctogdm list

  # Render the export into ./output with LibreOffice
  ctogdm render

  # Copy attachments next to the rendered pages
  ctogdm attachments

  # Fetch Word documents from the live site, then convert them to .docx
  ctogdm download
  ctogdm --render-source downloaded render

ENVIRONMENT VARIABLES:
  ATLASSIAN_EXPORT_PATH               Unpacked HTML export (default: confluence-export)
  ATLASSIAN_DOWNLOAD_PATH             Download directory (default: downloaded-pages)
  ATLASSIAN_OUTPUT_PATH               Render target, cleared on every render (default: output)
  ATLASSIAN_BASE_URL                  https://<site>.atlassian.net, for download
  ATLASSIAN_EMAIL                     Account e-mail, for download
  ATLASSIAN_API_TOKEN                 API token, for download
  LIBREOFFICE_CONVERSION_CONCURRENCY  Parallel conversions (default and maximum: CPU count)
  LIBRE_OFFICE_EXE                    Path to soffice
  PANDOC_EXE                          Path to pandoc

  A .env file in the working directory is loaded first.
"#;

/// Migrate a Confluence HTML export into a hierarchy of Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "ctogdm",
    version,
    about = "Migrate a Confluence HTML export into a hierarchy of Word documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Unpacked Confluence HTML export (contains index.html).
    #[arg(long, global = true, env = "ATLASSIAN_EXPORT_PATH", default_value = "confluence-export")]
    export_path: PathBuf,

    /// Directory for documents fetched by `download`.
    #[arg(long, global = true, env = "ATLASSIAN_DOWNLOAD_PATH", default_value = "downloaded-pages")]
    download_path: PathBuf,

    /// Output root. Removed and recreated by `render`.
    #[arg(short, long, global = true, env = "ATLASSIAN_OUTPUT_PATH", default_value = "output")]
    output_path: PathBuf,

    /// Confluence site URL, e.g. https://example.atlassian.net.
    #[arg(long, global = true, env = "ATLASSIAN_BASE_URL", default_value = "")]
    base_url: String,

    /// Atlassian account e-mail.
    #[arg(long, global = true, env = "ATLASSIAN_EMAIL", default_value = "")]
    email: String,

    /// Atlassian API token.
    #[arg(long, global = true, env = "ATLASSIAN_API_TOKEN", default_value = "", hide_env_values = true)]
    api_token: String,

    /// Number of concurrent conversions (clamped to the CPU count).
    #[arg(short, long, global = true, env = "LIBREOFFICE_CONVERSION_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Document converter used by `render`.
    #[arg(long, global = true, env = "CTOGDM_CONVERTER", value_enum, default_value = "libreoffice")]
    converter: ConverterArg,

    /// Where `render` reads pages from.
    #[arg(long, global = true, env = "CTOGDM_RENDER_SOURCE", value_enum, default_value = "export")]
    render_source: RenderSourceArg,

    /// HTTP timeout per downloaded page in seconds.
    #[arg(long, global = true, env = "CTOGDM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, global = true, env = "CTOGDM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CTOGDM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CTOGDM_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Print the page tree of the export.
    List {
        /// Print the tree as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Download every page as a Word document from Confluence.
    Download,
    /// Clear the output directory and convert every page into it.
    Render,
    /// Copy each page's attachments next to its rendered document.
    #[command(alias = "sync")]
    Attachments,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ConverterArg {
    Libreoffice,
    Pandoc,
    Passthrough,
}

impl From<ConverterArg> for ConverterKind {
    fn from(v: ConverterArg) -> Self {
        match v {
            ConverterArg::Libreoffice => ConverterKind::LibreOffice,
            ConverterArg::Pandoc => ConverterKind::Pandoc,
            ConverterArg::Passthrough => ConverterKind::Passthrough,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RenderSourceArg {
    Export,
    Downloaded,
}

impl From<RenderSourceArg> for RenderSource {
    fn from(v: RenderSourceArg) -> Self {
        match v {
            RenderSourceArg::Export => RenderSource::Export,
            RenderSourceArg::Downloaded => RenderSource::Downloaded,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env must be visible before clap reads `env = ...` fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during render.
    let show_progress = !cli.quiet && !cli.no_progress && cli.command == Command::Render;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RenderProgressCallback>)
    } else {
        None
    };
    let pipeline = ExportPipeline::from_config_with_progress(&config, progress)
        .context("Failed to set up the export pipeline")?;

    let start = Instant::now();
    match cli.command {
        Command::List { json } => {
            let pages = pipeline.list_pages().await.context("Failed to list pages")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(pages.as_slice())
                        .context("Failed to serialise page tree")?
                );
            } else {
                println!("{}", format_page_tree(&pages));
            }
        }
        Command::Download => {
            let count = pipeline
                .download_pages(None)
                .await
                .context("Download failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} pages  {}ms  →  {}",
                    green("✔"),
                    count,
                    start.elapsed().as_millis(),
                    bold(&config.download_path.display().to_string()),
                );
            }
        }
        Command::Render => {
            pipeline.render_pages(None).await.context("Render failed")?;
            if !cli.quiet {
                eprintln!(
                    "   {}  →  {}",
                    dim(&format!("{}ms total", start.elapsed().as_millis())),
                    bold(&config.output_path.display().to_string()),
                );
            }
        }
        Command::Attachments => {
            let copied = pipeline
                .sync_attachments()
                .await
                .context("Attachment sync failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} attachment folders  →  {}",
                    green("✔"),
                    copied,
                    bold(&config.output_path.display().to_string()),
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `MigrationConfig`.
fn build_config(cli: &Cli) -> Result<MigrationConfig> {
    let mut builder = MigrationConfig::builder()
        .export_path(&cli.export_path)
        .download_path(&cli.download_path)
        .output_path(&cli.output_path)
        .base_url(&cli.base_url)
        .credentials(&cli.email, &cli.api_token)
        .converter(cli.converter.into())
        .render_source(cli.render_source.into())
        .download_timeout_secs(cli.download_timeout);

    if let Some(n) = cli.concurrency {
        builder = builder.conversion_concurrency(n);
    }

    builder.build().context("Invalid configuration")
}
