//! External converters driven against fake `pandoc` / `soffice` shell scripts.
//!
//! All scripts are written once, before any of them is executed, so no test
//! forks while another still holds a script open for writing (ETXTBSY).
#![cfg(unix)]

use confluence_migrate::converter::BinaryLocator;
use confluence_migrate::{
    DocumentConverter, LibreOfficeConverter, MigrateError, PageContent, PandocConverter,
};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use tempfile::TempDir;

const FAKE_PANDOC: &str = r#"#!/bin/sh
out=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    --resource-path) resources="$2"; shift 2 ;;
    --from|--to) shift 2 ;;
    *) input="$1"; shift ;;
  esac
done
{
  echo "cwd=$(pwd -P)"
  echo "resources=$resources"
  cat "$input"
} > "$out"
"#;

const NOISY_PANDOC: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "partial" > "$out"
echo "[WARNING] Could not fetch resource 'missing.png'" >&2
"#;

const FAKE_SOFFICE: &str = r#"#!/bin/sh
outdir=""
input=""
filter=""
profile=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    --convert-to) shift 2 ;;
    --infilter=*) filter="$1"; shift ;;
    -env:UserInstallation=*) profile="$1"; shift ;;
    --*) shift ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input")
stem="${name%.*}"
mkdir -p "$outdir"
{
  echo "$filter"
  echo "$profile"
  cat "$input"
} > "$outdir/$stem.docx"
echo "javaldx: Could not find a Java Runtime Environment!" >&2
"#;

const SILENT_SOFFICE: &str = "#!/bin/sh\nexit 0\n";

const FAILING: &str = "#!/bin/sh\necho boom >&2\nexit 3\n";

struct FakeBins {
    dir: TempDir,
}

impl FakeBins {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn fake_bins() -> &'static FakeBins {
    static BINS: OnceLock<FakeBins> = OnceLock::new();
    BINS.get_or_init(|| {
        let dir = tempfile::Builder::new()
            .prefix("ctogdm-fake-bins-")
            .tempdir()
            .unwrap();
        for (name, body) in [
            ("pandoc", FAKE_PANDOC),
            ("noisy-pandoc", NOISY_PANDOC),
            ("soffice", FAKE_SOFFICE),
            ("silent-soffice", SILENT_SOFFICE),
            ("failing", FAILING),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        FakeBins { dir }
    })
}

fn html_page(working_directory: Option<PathBuf>) -> PageContent {
    PageContent {
        bytes: b"<h1>Hello</h1>".to_vec(),
        working_directory,
        file_name: Some("Hello_42.html".into()),
    }
}

// ── pandoc ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pandoc_runs_in_export_root_and_returns_output() {
    let export = tempfile::tempdir().unwrap();
    let converter = PandocConverter::new(fake_bins().path("pandoc"));

    let out = converter
        .convert(&html_page(Some(export.path().to_path_buf())))
        .await
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    let root = export.path().canonicalize().unwrap();
    assert!(out.contains(&format!("cwd={}", root.display())), "got: {out}");
    assert!(
        out.contains(&format!("resources={}", export.path().display())),
        "got: {out}"
    );
    assert!(out.ends_with("<h1>Hello</h1>"), "got: {out}");
}

#[tokio::test]
async fn pandoc_stderr_is_a_failure() {
    let converter = PandocConverter::new(fake_bins().path("noisy-pandoc"));
    let err = converter.convert(&html_page(None)).await.unwrap_err();
    match err {
        MigrateError::ConversionFailed { converter, detail } => {
            assert_eq!(converter, "pandoc");
            assert!(detail.contains("missing.png"), "detail: {detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn pandoc_nonzero_exit_is_a_failure() {
    let converter = PandocConverter::new(fake_bins().path("failing"));
    let err = converter.convert(&html_page(None)).await.unwrap_err();
    assert!(matches!(err, MigrateError::ConversionFailed { .. }), "got: {err}");
    assert!(err.to_string().contains("boom"), "got: {err}");
}

// ── LibreOffice ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn soffice_uses_html_filter_and_private_profile() {
    let converter = LibreOfficeConverter::new(fake_bins().path("soffice"));

    let out = converter.convert(&html_page(None)).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    let mut lines = out.lines();

    assert_eq!(lines.next(), Some("--infilter=HTML (StarWriter)"));
    let profile = lines.next().unwrap();
    assert!(
        profile.starts_with("-env:UserInstallation=file://"),
        "got: {profile}"
    );
    assert!(profile.contains("ctogdm-"), "got: {profile}");
    assert_eq!(lines.next(), Some("<h1>Hello</h1>"));
}

#[tokio::test]
async fn soffice_detects_format_of_downloaded_documents() {
    let converter = LibreOfficeConverter::new(fake_bins().path("soffice")).detect_input_format();
    let download = PageContent {
        bytes: b"MIME-Version: 1.0".to_vec(),
        working_directory: None,
        file_name: Some("Hello_42.doc".into()),
    };

    let out = converter.convert(&download).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    let mut lines = out.lines();

    assert_eq!(lines.next(), Some(""), "no input filter expected, got: {out}");
    assert!(lines.next().unwrap().starts_with("-env:UserInstallation="));
    assert_eq!(lines.next(), Some("MIME-Version: 1.0"));
}

#[tokio::test]
async fn soffice_without_output_is_a_failure() {
    let converter = LibreOfficeConverter::new(fake_bins().path("silent-soffice"));
    let err = converter.convert(&html_page(None)).await.unwrap_err();
    match err {
        MigrateError::ConversionFailed { converter, detail } => {
            assert_eq!(converter, "LibreOffice");
            assert!(detail.contains("Hello_42.docx"), "detail: {detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn soffice_nonzero_exit_is_a_failure() {
    let converter = LibreOfficeConverter::new(fake_bins().path("failing"));
    let err = converter.convert(&html_page(None)).await.unwrap_err();
    assert!(matches!(err, MigrateError::ConversionFailed { .. }), "got: {err}");
}

// ── Discovery ────────────────────────────────────────────────────────────────

#[test]
fn locator_accepts_override_pointing_at_fake_binary() {
    let fake = fake_bins().path("soffice");
    let found = BinaryLocator::libreoffice()
        .locate_with(Some(fake.clone().into_os_string()))
        .unwrap();
    assert_eq!(found, fake);
}
