//! Locating external converter executables.
//!
//! Resolution order, first hit wins:
//!
//! 1. The environment override (`PANDOC_EXE`, `LIBRE_OFFICE_EXE`) if it
//!    names an existing file
//! 2. Well-known install locations for the current platform
//! 3. `PATH`, via the `which` crate
//!
//! An override that points nowhere is logged and skipped rather than fatal,
//! so a stale variable does not hide a perfectly good system install.

use crate::error::{MigrateError, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Where to look for one converter binary.
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    /// Human-readable tool name for errors ("LibreOffice", "pandoc").
    pub tool: &'static str,
    /// Environment variable holding an explicit path.
    pub env_var: &'static str,
    /// Absolute install locations checked in order.
    pub candidates: Vec<PathBuf>,
    /// Program names looked up on `PATH`.
    pub path_names: Vec<&'static str>,
}

impl BinaryLocator {
    /// Locator for LibreOffice's `soffice`.
    pub fn libreoffice() -> Self {
        let candidates: &[&str] = if cfg!(target_os = "macos") {
            &["/Applications/LibreOffice.app/Contents/MacOS/soffice"]
        } else if cfg!(windows) {
            &[
                r"C:\Program Files\LibreOffice\program\soffice.exe",
                r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
            ]
        } else {
            &[
                "/usr/bin/soffice",
                "/usr/local/bin/soffice",
                "/usr/lib/libreoffice/program/soffice",
                "/opt/libreoffice/program/soffice",
                "/snap/bin/libreoffice",
            ]
        };
        Self {
            tool: "LibreOffice",
            env_var: "LIBRE_OFFICE_EXE",
            candidates: candidates.iter().map(PathBuf::from).collect(),
            path_names: vec!["soffice", "libreoffice"],
        }
    }

    /// Locator for `pandoc`.
    pub fn pandoc() -> Self {
        let candidates: &[&str] = if cfg!(target_os = "macos") {
            &["/opt/homebrew/bin/pandoc", "/usr/local/bin/pandoc"]
        } else if cfg!(windows) {
            &[r"C:\Program Files\Pandoc\pandoc.exe"]
        } else {
            &["/usr/bin/pandoc", "/usr/local/bin/pandoc"]
        };
        Self {
            tool: "pandoc",
            env_var: "PANDOC_EXE",
            candidates: candidates.iter().map(PathBuf::from).collect(),
            path_names: vec!["pandoc"],
        }
    }

    /// Resolve the binary using the process environment.
    pub fn locate(&self) -> Result<PathBuf> {
        self.locate_with(std::env::var_os(self.env_var))
    }

    /// Resolve the binary with an explicit override value.
    pub fn locate_with(&self, env_override: Option<OsString>) -> Result<PathBuf> {
        let mut searched = Vec::new();

        if let Some(value) = env_override.filter(|v| !v.is_empty()) {
            let path = PathBuf::from(value);
            if path.is_file() {
                debug!("{} from ${}: {}", self.tool, self.env_var, path.display());
                return Ok(path);
            }
            warn!(
                "${} points to '{}', which does not exist; searching default locations",
                self.env_var,
                path.display()
            );
            searched.push(format!("${}={}", self.env_var, path.display()));
        } else {
            searched.push(format!("${}", self.env_var));
        }

        for candidate in &self.candidates {
            if candidate.is_file() {
                debug!("{} found at {}", self.tool, candidate.display());
                return Ok(candidate.clone());
            }
            searched.push(candidate.display().to_string());
        }

        for name in &self.path_names {
            if let Ok(path) = which::which(name) {
                debug!("{} found on PATH: {}", self.tool, path.display());
                return Ok(path);
            }
            searched.push(format!("{name} on PATH"));
        }

        Err(MigrateError::ConverterUnavailable {
            converter: self.tool.to_string(),
            searched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nowhere(tmp: &std::path::Path) -> BinaryLocator {
        BinaryLocator {
            tool: "fake-tool",
            env_var: "CTOGDM_FAKE_TOOL_EXE",
            candidates: vec![tmp.join("missing/fake-tool")],
            path_names: vec!["ctogdm-definitely-not-installed-xyz"],
        }
    }

    #[test]
    fn override_wins_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("tool");
        std::fs::write(&exe, "").unwrap();

        let mut locator = nowhere(tmp.path());
        locator.candidates.insert(0, tmp.path().join("other"));
        std::fs::write(tmp.path().join("other"), "").unwrap();

        let found = locator.locate_with(Some(exe.clone().into_os_string())).unwrap();
        assert_eq!(found, exe);
    }

    #[test]
    fn missing_override_falls_back_to_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let installed = tmp.path().join("installed");
        std::fs::write(&installed, "").unwrap();

        let mut locator = nowhere(tmp.path());
        locator.candidates.push(installed.clone());

        let found = locator
            .locate_with(Some(OsString::from("/missing/soffice")))
            .unwrap();
        assert_eq!(found, installed);
    }

    #[test]
    fn nothing_found_lists_every_location() {
        let tmp = tempfile::tempdir().unwrap();
        let err = nowhere(tmp.path())
            .locate_with(Some(OsString::from("/missing/soffice")))
            .unwrap_err();

        match err {
            MigrateError::ConverterUnavailable { converter, searched } => {
                assert_eq!(converter, "fake-tool");
                assert_eq!(searched.len(), 3, "searched: {searched:?}");
                assert!(searched[0].contains("/missing/soffice"));
                assert!(searched[2].contains("on PATH"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
