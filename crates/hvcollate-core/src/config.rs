//! Collation settings supplied when the step is constructed.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "output-hyperv";

/// Settings for the collation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateConfig {
    /// Directory the user expects the build artifacts in.
    pub output_dir: PathBuf,
    /// The full VM export was skipped; only disks are collected.
    pub skip_export: bool,
}

impl Default for CollateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            skip_export: false,
        }
    }
}

impl CollateConfig {
    pub fn new(output_dir: impl Into<PathBuf>, skip_export: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            skip_export,
        }
    }

    /// Reject settings no collation can run with.
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output directory must not be empty"));
        }
        Ok(())
    }
}
