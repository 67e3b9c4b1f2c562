//! HTML → DOCX through pandoc.
//!
//! Pandoc runs with its working directory and `--resource-path` set to the
//! export root, so `<img src="attachments/123/file.png">` in a page resolves
//! to the exported attachment and is embedded in the document.

use super::{input_file_name, stderr_summary, BinaryLocator, DocumentConverter, TEMP_PREFIX};
use crate::error::{MigrateError, Result};
use crate::source::PageContent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Converter driving the `pandoc` binary.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    binary: PathBuf,
}

impl PandocConverter {
    /// Use an explicit pandoc binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Locate pandoc via `$PANDOC_EXE`, install paths, then `PATH`.
    pub fn discover() -> Result<Self> {
        Ok(Self::new(BinaryLocator::pandoc().locate()?))
    }

    fn args(input: &Path, output: &Path, resource_path: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "--from".into(),
            "html".into(),
            "--to".into(),
            "docx".into(),
            "--output".into(),
            output.into(),
            "--resource-path".into(),
            resource_path.into(),
            input.into(),
        ]
    }
}

#[async_trait]
impl DocumentConverter for PandocConverter {
    async fn convert(&self, content: &PageContent) -> Result<Vec<u8>> {
        let temp_dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| MigrateError::Internal(format!("tempdir: {e}")))?;

        let input_name = input_file_name(content, "source.html");
        let input_path = temp_dir.path().join(&input_name);
        let stem = Path::new(&input_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());
        let output_path = temp_dir.path().join(format!("{stem}.docx"));
        let working_dir = content
            .working_directory
            .clone()
            .unwrap_or_else(|| temp_dir.path().to_path_buf());

        tokio::fs::write(&input_path, &content.bytes)
            .await
            .map_err(|e| MigrateError::io(&input_path, e))?;

        debug!("pandoc {} → {}", input_path.display(), output_path.display());
        let output = Command::new(&self.binary)
            .args(Self::args(&input_path, &output_path, &working_dir))
            .current_dir(&working_dir)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MigrateError::ConverterUnavailable {
                        converter: "pandoc".into(),
                        searched: vec![self.binary.display().to_string()],
                    }
                } else {
                    MigrateError::ConversionFailed {
                        converter: "pandoc".into(),
                        detail: format!("failed to start {}: {e}", self.binary.display()),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(MigrateError::ConversionFailed {
                converter: "pandoc".into(),
                detail: format!("{}: {}", output.status, stderr_summary(&output.stderr)),
            });
        }

        let stderr = stderr_summary(&output.stderr);
        if !stderr.is_empty() {
            return Err(MigrateError::ConversionFailed {
                converter: "pandoc".into(),
                detail: format!("pandoc reported an error: {stderr}"),
            });
        }

        tokio::fs::read(&output_path).await.map_err(|e| MigrateError::ConversionFailed {
            converter: "pandoc".into(),
            detail: format!("no output at {}: {e}", output_path.display()),
        })
    }

    fn name(&self) -> &str {
        "pandoc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_resource_path() {
        let args = PandocConverter::args(
            Path::new("/tmp/x/in.html"),
            Path::new("/tmp/x/in.docx"),
            Path::new("/exports/site"),
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let rp = args.iter().position(|a| a == "--resource-path").unwrap();
        assert_eq!(args[rp + 1], "/exports/site");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/x/in.html"));
        assert!(args.windows(2).any(|w| w[0] == "--to" && w[1] == "docx"));
    }

    #[tokio::test]
    async fn missing_binary_is_descriptive() {
        let converter = PandocConverter::new("/definitely/not/here/pandoc");
        let err = converter
            .convert(&PageContent::from_bytes(b"<p>x</p>".to_vec()))
            .await
            .unwrap_err();
        assert!(
            err.to_string().contains("pandoc is not available"),
            "got: {err}"
        );
    }
}
