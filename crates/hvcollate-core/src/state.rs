//! Shared build state and the user-facing reporting sink.
//!
//! The [`StateBag`] lives for the whole build and is threaded through every
//! step by mutable reference. Keys are typed fields rather than entries in
//! a dynamic map, so a step never has to assert on the type of a value.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// State shared between the steps of one build.
#[derive(Debug, Default)]
pub struct StateBag {
    build_dir: Option<PathBuf>,
    export_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    error: Option<Error>,
}

impl StateBag {
    /// Create an empty state bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Working directory the VM was built in.
    ///
    /// An unset key reads as an empty path.
    pub fn build_dir(&self) -> &Path {
        self.build_dir.as_deref().unwrap_or(Path::new(""))
    }

    pub fn set_build_dir(&mut self, path: impl Into<PathBuf>) {
        self.build_dir = Some(path.into());
    }

    /// Directory the hypervisor exported the VM into.
    ///
    /// An unset key reads as an empty path.
    pub fn export_path(&self) -> &Path {
        self.export_path.as_deref().unwrap_or(Path::new(""))
    }

    pub fn set_export_path(&mut self, path: impl Into<PathBuf>) {
        self.export_path = Some(path.into());
    }

    /// Output directory recorded by an earlier step, if any.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn set_output_dir(&mut self, path: impl Into<PathBuf>) {
        self.output_dir = Some(path.into());
    }

    /// The error that stopped the build, if one has been recorded.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Record a fatal error. A later error replaces an earlier one.
    pub fn put_error(&mut self, err: Error) {
        self.error = Some(err);
    }

    /// Remove and return the recorded error.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Sink for user-visible progress and failure messages.
pub trait Ui {
    /// Report progress.
    fn say(&self, message: &str);

    /// Report a failure or warning.
    fn error(&self, message: &str);
}

/// [`Ui`] writing progress to stdout and failures to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("==> {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("==> {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_paths_read_as_empty() {
        let state = StateBag::new();
        assert_eq!(state.build_dir(), Path::new(""));
        assert_eq!(state.export_path(), Path::new(""));
        assert!(state.output_dir().is_none());
        assert!(!state.has_error());
    }

    #[test]
    fn test_set_paths() {
        let mut state = StateBag::new();
        state.set_build_dir("/b");
        state.set_export_path("/e");
        state.set_output_dir("/out");
        assert_eq!(state.build_dir(), Path::new("/b"));
        assert_eq!(state.export_path(), Path::new("/e"));
        assert_eq!(state.output_dir(), Some(Path::new("/out")));
    }

    #[test]
    fn test_error_slot() {
        let mut state = StateBag::new();
        state.put_error(Error::driver("first"));
        state.put_error(Error::driver("second"));
        assert_eq!(state.error().map(|e| e.to_string()), Some("second".to_string()));

        let taken = state.take_error();
        assert!(taken.is_some());
        assert!(!state.has_error());
    }
}
