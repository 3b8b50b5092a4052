//! The collation step.
//!
//! Runs after the VM has been built and, optionally, exported. Depending on
//! the [`CollationMode`] it either gathers the virtual disks from the build
//! directory or restores the legacy export layout, so the artifacts end up
//! where the user was told to expect them.
//!
//! A failed disk move halts the build: the disks are the only artifact the
//! user asked for. A failed layout restore is only a warning, since the
//! export itself already succeeded.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::CollateConfig;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::state::{StateBag, Ui};
use crate::step::{RunContext, Step, StepAction};
use crate::wsl::PathTranslator;

/// Which artifacts the step collates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollationMode {
    /// The export was skipped; move disks out of the build directory.
    SkipExport,
    /// The VM was exported; flatten the export's VM-name folder.
    FullExport,
}

impl CollationMode {
    pub fn from_skip_export(skip_export: bool) -> Self {
        if skip_export {
            Self::SkipExport
        } else {
            Self::FullExport
        }
    }
}

/// Step that collates build artifacts under the output directory.
pub struct StepCollateArtifacts {
    output_dir: PathBuf,
    mode: CollationMode,
    driver: Box<dyn Driver>,
    ui: Box<dyn Ui>,
    paths: Box<dyn PathTranslator>,
}

impl StepCollateArtifacts {
    pub fn new(
        config: &CollateConfig,
        driver: Box<dyn Driver>,
        ui: Box<dyn Ui>,
        paths: Box<dyn PathTranslator>,
    ) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            mode: CollationMode::from_skip_export(config.skip_export),
            driver,
            ui,
            paths,
        }
    }

    pub fn mode(&self) -> CollationMode {
        self.mode
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn host_path(&self, path: &Path) -> Result<PathBuf> {
        if self.paths.is_alternate_environment() {
            self.paths.to_host_native_path(path)
        } else {
            Ok(path.to_path_buf())
        }
    }

    /// Record a fatal error, report it, and halt.
    fn halt(&self, state: &mut StateBag, err: Error) -> StepAction {
        error!(error = %err, "collation failed");
        self.ui.error(&err.to_string());
        state.put_error(err);
        StepAction::Halt
    }
}

impl Step for StepCollateArtifacts {
    fn name(&self) -> &str {
        "collate-artifacts"
    }

    fn run(&mut self, _ctx: &RunContext, state: &mut StateBag) -> StepAction {
        self.ui.say("Collating build artifacts...");

        let output_dir = match self.host_path(&self.output_dir) {
            Ok(path) => path,
            Err(err) => return self.halt(state, err),
        };

        match self.mode {
            CollationMode::SkipExport => {
                let build_dir = state.build_dir().to_path_buf();
                info!(build_dir = %build_dir.display(), output = %output_dir.display(), "moving created disks");

                if let Err(err) = self
                    .driver
                    .move_created_vhds_to_output_dir(&build_dir, &output_dir)
                {
                    return self.halt(state, Error::vhd_move(err));
                }
            }
            CollationMode::FullExport => {
                let export_path = match self.host_path(state.export_path()) {
                    Ok(path) => path,
                    Err(err) => return self.halt(state, err),
                };
                info!(export = %export_path.display(), output = %output_dir.display(), "restoring legacy export layout");

                if let Err(err) = self
                    .driver
                    .preserve_legacy_export_behaviour(&export_path, &output_dir)
                {
                    let err = Error::legacy_restructure(err);
                    warn!(error = %err, "continuing without legacy layout");
                    self.ui.error(&err.to_string());
                }
            }
        }

        StepAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_skip_export() {
        assert_eq!(CollationMode::from_skip_export(true), CollationMode::SkipExport);
        assert_eq!(CollationMode::from_skip_export(false), CollationMode::FullExport);
    }
}
