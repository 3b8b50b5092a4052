//! Path translation between WSL and the Windows host.
//!
//! When the tool runs inside WSL, paths it receives use Linux syntax
//! (`/mnt/c/builds/out`) while Hyper-V operates on Windows paths
//! (`C:\builds\out`). [`WslPaths`] detects that situation and converts with
//! the `wslpath` utility shipped with WSL.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Default location of the kernel version string used for WSL detection.
pub const PROC_VERSION: &str = "/proc/version";

/// Name of the WSL path conversion utility.
pub const WSLPATH: &str = "wslpath";

/// Classifies the execution environment and converts paths for the host.
pub trait PathTranslator {
    /// Whether paths must be rewritten before being handed to the host.
    fn is_alternate_environment(&self) -> bool;

    /// Convert `path` into the host-native form.
    fn to_host_native_path(&self, path: &Path) -> Result<PathBuf>;
}

/// Translator for hosts where no conversion is ever needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePaths;

impl PathTranslator for NativePaths {
    fn is_alternate_environment(&self) -> bool {
        false
    }

    fn to_host_native_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// Translator backed by `wslpath`.
#[derive(Debug, Clone)]
pub struct WslPaths {
    in_wsl: bool,
    program: PathBuf,
}

impl WslPaths {
    /// Create a translator with an explicit environment classification.
    pub fn new(in_wsl: bool) -> Self {
        Self {
            in_wsl,
            program: PathBuf::from(WSLPATH),
        }
    }

    /// Detect WSL from [`PROC_VERSION`].
    pub fn detect() -> Self {
        Self::detect_from(Path::new(PROC_VERSION))
    }

    /// Detect WSL from the given kernel version file.
    ///
    /// An unreadable file means "not WSL".
    pub fn detect_from(proc_version: &Path) -> Self {
        let in_wsl = cfg!(target_os = "linux")
            && fs::read_to_string(proc_version)
                .map(|version| is_wsl_kernel(&version))
                .unwrap_or(false);
        debug!(in_wsl, probe = %proc_version.display(), "detected execution environment");
        Self::new(in_wsl)
    }

    /// Use a different conversion program.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Convert a Windows path back into the WSL form.
    pub fn to_environment_path(&self, path: &Path) -> Result<PathBuf> {
        if !self.in_wsl {
            return Ok(path.to_path_buf());
        }
        self.convert(path, "-u")
    }

    fn convert(&self, path: &Path, flag: &str) -> Result<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(Error::path_translation(path, "path is empty"));
        }

        let output = Command::new(&self.program)
            .arg("-a")
            .arg(flag)
            .arg(path)
            .output()
            .map_err(|e| {
                Error::path_translation(
                    path,
                    format!("failed to run {}: {}", self.program.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::path_translation(
                path,
                format!("{} exited with {}: {}", self.program.display(), output.status, stderr.trim()),
            ));
        }

        let converted = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if converted.is_empty() {
            return Err(Error::path_translation(
                path,
                format!("{} returned an empty path", self.program.display()),
            ));
        }

        debug!(from = %path.display(), to = %converted, "translated path");
        Ok(PathBuf::from(converted))
    }
}

impl PathTranslator for WslPaths {
    fn is_alternate_environment(&self) -> bool {
        self.in_wsl
    }

    fn to_host_native_path(&self, path: &Path) -> Result<PathBuf> {
        if !self.in_wsl {
            return Ok(path.to_path_buf());
        }
        self.convert(path, "-w")
    }
}

/// Whether a `/proc/version` string belongs to a WSL kernel.
pub fn is_wsl_kernel(version: &str) -> bool {
    version.to_ascii_lowercase().contains("microsoft")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_wsl_kernel() {
        assert!(is_wsl_kernel(
            "Linux version 5.15.153.1-microsoft-standard-WSL2 (root@65c757a075e2)"
        ));
        assert!(is_wsl_kernel("Linux version 4.4.0-19041-Microsoft"));
        assert!(!is_wsl_kernel("Linux version 6.8.0-45-generic (buildd@lcy02-amd64-115)"));
    }

    #[test]
    fn test_detect_from_missing_file() {
        let translator = WslPaths::detect_from(Path::new("/definitely/not/here/version"));
        assert!(!translator.is_alternate_environment());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_detect_from_wsl_version_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Linux version 5.15.153.1-microsoft-standard-WSL2").unwrap();

        let translator = WslPaths::detect_from(file.path());
        assert!(translator.is_alternate_environment());
    }

    #[test]
    fn test_native_paths_identity() {
        let translator = NativePaths;
        assert!(!translator.is_alternate_environment());
        assert_eq!(
            translator.to_host_native_path(Path::new("/out")).unwrap(),
            PathBuf::from("/out")
        );
    }

    #[test]
    fn test_outside_wsl_is_identity() {
        let translator = WslPaths::new(false).with_program("/nonexistent/wslpath");
        assert_eq!(
            translator.to_host_native_path(Path::new("/out")).unwrap(),
            PathBuf::from("/out")
        );
        assert_eq!(
            translator.to_environment_path(Path::new("C:\\out")).unwrap(),
            PathBuf::from("C:\\out")
        );
    }

    #[test]
    fn test_missing_program_is_translation_error() {
        let translator = WslPaths::new(true).with_program("/nonexistent/wslpath");
        let err = translator
            .to_host_native_path(Path::new("/mnt/c/out"))
            .unwrap_err();
        assert!(matches!(err, Error::PathTranslation { .. }));
        assert!(err.to_string().contains("/mnt/c/out"));
    }

    #[test]
    fn test_empty_path_is_translation_error() {
        let translator = WslPaths::new(true);
        let err = translator.to_host_native_path(Path::new("")).unwrap_err();
        assert!(err.to_string().contains("path is empty"));
    }
}
