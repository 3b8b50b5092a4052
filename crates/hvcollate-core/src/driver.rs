//! Filesystem operations that restructure Hyper-V build output.
//!
//! The [`Driver`] trait is the seam the collation step talks to. [`FsDriver`]
//! implements it with plain filesystem moves:
//!
//! - [`Driver::move_created_vhds_to_output_dir`] gathers every virtual disk
//!   under the build directory into `<output>/Virtual Hard Disks`.
//! - [`Driver::preserve_legacy_export_behaviour`] lifts the folders a full
//!   export nests under `<export>/<vm name>/` up to `<output>/`.
//!
//! Moves are renames where possible. When a rename fails (typically because
//! source and destination are on different volumes) the data is copied,
//! verified, and the source removed.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Folder holding snapshot state in a Hyper-V export.
pub const SNAPSHOTS_DIR: &str = "Snapshots";
/// Folder holding virtual disks in a Hyper-V export.
pub const VIRTUAL_HARD_DISKS_DIR: &str = "Virtual Hard Disks";
/// Folder holding VM definition files in a Hyper-V export.
pub const VIRTUAL_MACHINES_DIR: &str = "Virtual Machines";

/// Folders restored directly under the output directory, in move order.
pub const LEGACY_EXPORT_DIRS: [&str; 3] =
    [SNAPSHOTS_DIR, VIRTUAL_HARD_DISKS_DIR, VIRTUAL_MACHINES_DIR];

/// Hypervisor operations the collation step depends on.
pub trait Driver {
    /// Move every virtual disk found under `src` into
    /// `dst/Virtual Hard Disks`, creating that folder if needed.
    fn move_created_vhds_to_output_dir(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Move the export folders nested under the single VM-name folder in
    /// `export_dir` to be direct children of `output_dir`, then remove the
    /// VM-name folder.
    fn preserve_legacy_export_behaviour(&self, export_dir: &Path, output_dir: &Path)
        -> Result<()>;
}

/// [`Driver`] operating directly on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDriver;

impl FsDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for FsDriver {
    fn move_created_vhds_to_output_dir(&self, src: &Path, dst: &Path) -> Result<()> {
        require_non_empty(&[src, dst])?;
        require_exists(src)?;

        fs::create_dir_all(dst).map_err(|e| Error::io(e, dst))?;
        let src = fs::canonicalize(src).map_err(|e| Error::io(e, src))?;
        let dst = fs::canonicalize(dst).map_err(|e| Error::io(e, dst))?;
        let vhd_dir = dst.join(VIRTUAL_HARD_DISKS_DIR);

        let disks = find_disks(&src, &vhd_dir)?;
        if disks.is_empty() {
            if contains_disks(&vhd_dir)? {
                info!(dir = %vhd_dir.display(), "disks already collated, nothing to move");
                return Ok(());
            }
            return Err(Error::driver(format!(
                "No disks found under {}",
                src.display()
            )));
        }

        fs::create_dir_all(&vhd_dir).map_err(|e| Error::io(e, &vhd_dir))?;

        for disk in &disks {
            let file_name = disk
                .file_name()
                .ok_or_else(|| Error::driver(format!("disk path has no file name: {}", disk.display())))?;
            let target = vhd_dir.join(file_name);
            if target.exists() {
                return Err(Error::driver(format!(
                    "Destination {} already exists",
                    target.display()
                )));
            }
            move_path(disk, &target)?;
        }

        info!(count = disks.len(), dir = %vhd_dir.display(), "moved virtual disks");
        Ok(())
    }

    fn preserve_legacy_export_behaviour(
        &self,
        export_dir: &Path,
        output_dir: &Path,
    ) -> Result<()> {
        require_non_empty(&[export_dir, output_dir])?;
        require_exists(export_dir)?;
        require_exists(output_dir)?;

        let vm_dir = single_vm_dir(export_dir)?;
        debug!(vm_dir = %vm_dir.display(), "found exported VM folder");

        for name in LEGACY_EXPORT_DIRS {
            let from = vm_dir.join(name);
            if !from.is_dir() {
                debug!(dir = %from.display(), "export folder missing, skipping");
                continue;
            }

            if is_empty_dir(&from)? {
                debug!(dir = %from.display(), "export folder empty, pruning");
                fs::remove_dir(&from).map_err(|e| Error::io(e, &from))?;
                continue;
            }

            let to = output_dir.join(name);
            if to.exists() {
                return Err(Error::driver(format!(
                    "Destination {} already exists",
                    to.display()
                )));
            }
            move_path(&from, &to)?;
        }

        fs::remove_dir(&vm_dir).map_err(|e| Error::io(e, &vm_dir))?;
        info!(vm_dir = %vm_dir.display(), output = %output_dir.display(), "restored legacy export layout");
        Ok(())
    }
}

/// Whether a file name matches the Hyper-V disk pattern `*.*vhd*`.
///
/// Covers `.vhd`, `.vhdx`, `.avhd` and `.avhdx`, case-insensitively.
pub fn is_disk_file_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    match name.find('.') {
        Some(dot) => name[dot + 1..].contains("vhd"),
        None => false,
    }
}

fn require_non_empty(paths: &[&Path]) -> Result<()> {
    if paths.iter().any(|p| p.as_os_str().is_empty()) {
        return Err(Error::driver("A supplied path is empty"));
    }
    Ok(())
}

fn require_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::driver(format!(
            "Path {} does not exist",
            path.display()
        )));
    }
    Ok(())
}

/// Disk files under `root`, excluding anything already inside `skip`.
fn find_disks(root: &Path, skip: &Path) -> Result<Vec<PathBuf>> {
    let mut disks = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            Error::io(io::Error::from(e), path)
        })?;

        if !entry.file_type().is_file() || entry.path().starts_with(skip) {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_disk_file_name) {
            disks.push(entry.into_path());
        }
    }

    Ok(disks)
}

fn contains_disks(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    for entry in fs::read_dir(dir).map_err(|e| Error::io(e, dir))? {
        let entry = entry.map_err(|e| Error::io(e, dir))?;
        if entry.file_name().to_str().is_some_and(is_disk_file_name) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The only directory directly under `export_dir`.
fn single_vm_dir(export_dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(export_dir).map_err(|e| Error::io(e, export_dir))? {
        let entry = entry.map_err(|e| Error::io(e, export_dir))?;
        let path = entry.path();
        // Folders already restored by an earlier run are not VM folders.
        let restored = entry
            .file_name()
            .to_str()
            .is_some_and(|name| LEGACY_EXPORT_DIRS.contains(&name));
        if path.is_dir() && !restored {
            dirs.push(path);
        }
    }

    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        0 => Err(Error::driver(format!(
            "No exported VM folder found under {}",
            export_dir.display()
        ))),
        n => Err(Error::driver(format!(
            "Expected exactly one exported VM folder under {}, found {}",
            export_dir.display(),
            n
        ))),
    }
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir).map_err(|e| Error::io(e, dir))?;
    Ok(entries.next().is_none())
}

/// Move a file or directory, falling back to copy-and-remove.
fn move_path(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => {
            debug!(from = %from.display(), to = %to.display(), "renamed");
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, from = %from.display(), "rename failed, falling back to copy");
        }
    }

    if from.is_dir() {
        copy_dir(from, to)?;
        fs::remove_dir_all(from).map_err(|e| Error::io(e, from))?;
    } else {
        copy_file_verified(from, to)?;
        fs::remove_file(from).map_err(|e| Error::io(e, from))?;
    }
    debug!(from = %from.display(), to = %to.display(), "copied and removed source");
    Ok(())
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| from.to_path_buf());
            Error::io(io::Error::from(e), path)
        })?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| Error::driver(format!("{} escaped {}", entry.path().display(), from.display())))?;
        let target = to.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(e, &target))?;
        } else {
            copy_file_verified(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy a file and check the copy hashes the same as the source.
fn copy_file_verified(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| Error::io(e, to))?;

    let expected = sha256_file(from)?;
    let actual = sha256_file(to)?;
    if expected != actual {
        let _ = fs::remove_file(to);
        return Err(Error::driver(format!(
            "Copy of {} to {} does not match the source",
            from.display(),
            to.display()
        )));
    }
    Ok(())
}

fn sha256_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| Error::io(e, path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::io(e, path))?;
    Ok(hasher.finalize().to_vec())
}
