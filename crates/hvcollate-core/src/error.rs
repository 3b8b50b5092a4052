//! Error types for the hvcollate core library.

use std::path::PathBuf;

/// The main error type for artifact collation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// A path could not be rewritten into the host-native form.
    #[error("failed to translate path '{}': {message}", path.display())]
    PathTranslation { path: PathBuf, message: String },

    /// A driver precondition failed (empty path, unexpected layout, ...).
    #[error("{message}")]
    Driver { message: String },

    /// Disks could not be moved out of the build directory.
    #[error("Error moving VHDs from build dir to output dir: {source}")]
    VhdMove { source: Box<Error> },

    /// The legacy export layout could not be restored.
    #[error("WARNING: Error restoring legacy export dir structure: {source}")]
    LegacyRestructure { source: Box<Error> },

    /// Invalid collation configuration.
    #[error("Config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for collation operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create a path translation error.
    pub fn path_translation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PathTranslation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a driver error.
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Wrap a failure of the disk move.
    pub fn vhd_move(source: Error) -> Self {
        Self::VhdMove {
            source: Box::new(source),
        }
    }

    /// Wrap a failure of the legacy layout restore.
    pub fn legacy_restructure(source: Error) -> Self {
        Self::LegacyRestructure {
            source: Box::new(source),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error must stop the build when it reaches the collation step.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::LegacyRestructure { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(io_err, "/build/disk.vhdx");
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("/build/disk.vhdx"));
    }

    #[test]
    fn test_io_error_without_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io_simple(io_err);
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(!msg.contains("at '"));
    }

    #[test]
    fn test_path_translation_error() {
        let err = Error::path_translation("/mnt/q/out", "wslpath exited with status 1");
        let msg = err.to_string();
        assert!(msg.contains("/mnt/q/out"));
        assert!(msg.contains("wslpath exited"));
    }

    #[test]
    fn test_vhd_move_error_prefix() {
        let err = Error::vhd_move(Error::driver("No disks found under /b"));
        assert_eq!(
            err.to_string(),
            "Error moving VHDs from build dir to output dir: No disks found under /b"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_legacy_restructure_is_warning() {
        let err = Error::legacy_restructure(Error::driver("boom"));
        assert!(err.to_string().starts_with("WARNING: "));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("output directory is empty");
        assert!(err.to_string().contains("Config error"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { path: None, .. }));
    }
}
