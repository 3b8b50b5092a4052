//! hvcollate Core Library
//!
//! This crate collates the artifacts of a Hyper-V VM build into the output
//! directory the user expects.
//!
//! # Overview
//!
//! After a VM has been built, its disks sit in the build directory; after a
//! full export, its folders sit one level too deep under a VM-name folder.
//! [`StepCollateArtifacts`] reconciles either layout with the output
//! directory, translating WSL paths to Windows paths where needed.
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`config`] - Collation settings
//! - [`state`] - Shared build state and reporting sink
//! - [`step`] - Step trait and sequential runner
//! - [`driver`] - Filesystem restructuring operations
//! - [`wsl`] - WSL path translation
//! - [`collate`] - The collation step
//!
//! # Quick Start
//!
//! ```no_run
//! use hvcollate_core::{
//!     CollateConfig, ConsoleUi, FsDriver, RunContext, Runner, StateBag,
//!     StepCollateArtifacts, WslPaths,
//! };
//!
//! let config = CollateConfig::new("output-hyperv", true);
//! let step = StepCollateArtifacts::new(
//!     &config,
//!     Box::new(FsDriver::new()),
//!     Box::new(ConsoleUi),
//!     Box::new(WslPaths::detect()),
//! );
//!
//! let mut state = StateBag::new();
//! state.set_build_dir("/tmp/packer-build");
//!
//! let mut runner = Runner::new(Vec::new());
//! runner.push(Box::new(step));
//! runner.run(&RunContext::new(), &mut state);
//! ```

pub mod collate;
pub mod config;
pub mod driver;
pub mod error;
pub mod state;
pub mod step;
pub mod wsl;

pub use error::{Error, Result};

pub use collate::{CollationMode, StepCollateArtifacts};
pub use config::{CollateConfig, DEFAULT_OUTPUT_DIR};
pub use driver::{
    Driver, FsDriver, LEGACY_EXPORT_DIRS, SNAPSHOTS_DIR, VIRTUAL_HARD_DISKS_DIR,
    VIRTUAL_MACHINES_DIR,
};
pub use state::{ConsoleUi, StateBag, Ui};
pub use step::{RunContext, RunOutcome, Runner, Step, StepAction};
pub use wsl::{NativePaths, PathTranslator, WslPaths};
