//! HTML (or a downloaded Word document) → DOCX through LibreOffice in
//! headless mode.
//!
//! Every call gets its own temp directory holding the input, the output and a
//! throwaway user profile. soffice refuses to run two instances against one
//! profile, so without `-env:UserInstallation` concurrent jobs would fail or
//! serialise behind each other.

use super::{input_file_name, stderr_summary, BinaryLocator, DocumentConverter, TEMP_PREFIX};
use crate::error::{MigrateError, Result};
use crate::source::PageContent;
use async_trait::async_trait;
use reqwest::Url;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// HTML import filter; without it soffice opens `.html` in Writer/Web.
const HTML_FILTER: &str = "--infilter=HTML (StarWriter)";

/// Converter driving `soffice --headless --convert-to docx`.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    binary: PathBuf,
    input_filter: Option<&'static str>,
}

impl LibreOfficeConverter {
    /// Converter for export HTML pages.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            input_filter: Some(HTML_FILTER),
        }
    }

    /// Locate soffice via `$LIBRE_OFFICE_EXE`, install paths, then `PATH`.
    pub fn discover() -> Result<Self> {
        Ok(Self::new(BinaryLocator::libreoffice().locate()?))
    }

    /// Let soffice detect the input format, as needed for the MIME-HTML
    /// Word documents `exportword` returns.
    pub fn detect_input_format(mut self) -> Self {
        self.input_filter = None;
        self
    }

    fn args(&self, input: &Path, out_dir: &Path, profile_url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            format!("-env:UserInstallation={profile_url}").into(),
            "--headless".into(),
            "--norestore".into(),
            "--convert-to".into(),
            "docx".into(),
        ];
        if let Some(filter) = self.input_filter {
            args.push(filter.into());
        }
        args.push("--outdir".into());
        args.push(out_dir.into());
        args.push(input.into());
        args
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, content: &PageContent) -> Result<Vec<u8>> {
        let temp_dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| MigrateError::Internal(format!("tempdir: {e}")))?;

        let input_name = input_file_name(content, "source.html");
        let input_path = temp_dir.path().join(&input_name);
        let out_dir = temp_dir.path().join("out");
        let profile_dir = temp_dir.path().join("profile");
        let profile_url = Url::from_directory_path(&profile_dir)
            .map_err(|_| MigrateError::Internal(format!("profile path {} is not absolute", profile_dir.display())))?;

        tokio::fs::write(&input_path, &content.bytes)
            .await
            .map_err(|e| MigrateError::io(&input_path, e))?;

        debug!("soffice {} → {}", input_path.display(), out_dir.display());
        let mut command = Command::new(&self.binary);
        command.args(self.args(&input_path, &out_dir, profile_url.as_str()));
        if let Some(ref wd) = content.working_directory {
            command.current_dir(wd);
        }

        let output = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MigrateError::ConverterUnavailable {
                    converter: "LibreOffice".into(),
                    searched: vec![self.binary.display().to_string()],
                }
            } else {
                MigrateError::ConversionFailed {
                    converter: "LibreOffice".into(),
                    detail: format!("failed to start {}: {e}", self.binary.display()),
                }
            }
        })?;

        let stderr = stderr_summary(&output.stderr);
        if !output.status.success() {
            return Err(MigrateError::ConversionFailed {
                converter: "LibreOffice".into(),
                detail: format!("{}: {stderr}", output.status),
            });
        }
        if !stderr.is_empty() {
            debug!("soffice stderr: {}", stderr);
        }

        let stem = Path::new(&input_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());
        let result_path = out_dir.join(format!("{stem}.docx"));

        tokio::fs::read(&result_path).await.map_err(|e| MigrateError::ConversionFailed {
            converter: "LibreOffice".into(),
            detail: format!(
                "soffice exited successfully but produced no {} ({e}); stderr: {stderr}",
                result_path.display()
            ),
        })
    }

    fn name(&self) -> &str {
        "libreoffice"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg_strings(converter: &LibreOfficeConverter) -> Vec<String> {
        converter
            .args(
                Path::new("/tmp/x/source.html"),
                Path::new("/tmp/x/out"),
                "file:///tmp/x/profile/",
            )
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn args_select_docx_and_html_filter() {
        let args = arg_strings(&LibreOfficeConverter::new("soffice"));
        assert!(args.contains(&"--convert-to".to_string()));
        assert!(args.contains(&"docx".to_string()));
        assert!(args.contains(&"--infilter=HTML (StarWriter)".to_string()));
        assert_eq!(args[0], "-env:UserInstallation=file:///tmp/x/profile/");
        let od = args.iter().position(|a| a == "--outdir").unwrap();
        assert_eq!(args[od + 1], "/tmp/x/out");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/x/source.html"));
    }

    #[test]
    fn downloaded_documents_skip_the_html_filter() {
        let args = arg_strings(&LibreOfficeConverter::new("soffice").detect_input_format());
        assert!(args.iter().all(|a| !a.starts_with("--infilter")), "got: {args:?}");
        assert!(args.contains(&"docx".to_string()));
    }

    #[tokio::test]
    async fn missing_binary_is_descriptive() {
        let err = LibreOfficeConverter::new("/missing/soffice")
            .convert(&PageContent::from_bytes(b"<p>x</p>".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::ConverterUnavailable { .. }), "got: {err}");
        assert!(err.to_string().contains("/missing/soffice"));
    }
}
