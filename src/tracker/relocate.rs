// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File relocation logic.
//!
//! Utilities to move files and directory trees into the repository, and to
//! put symlinks in their place.
//!
//! # Copy Then Delete
//!
//! Relocation never renames. Content is copied to the destination first, and
//! the source is only removed once the copy has fully landed. The repository
//! may live on another device than the home directory, where rename is not
//! available. A crash mid-copy leaves a partial destination next to an intact
//! source, so running the same relocation again is always safe.
//!
//! Symlinks found inside a directory tree are dropped, never followed.

use mkdirp::mkdirp;
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Move file or directory tree from `source` to `destination`.
///
/// # Errors
///
/// - Return [`RelocateError`] if copying fails, in which case `source` stays
///   untouched, or if `source` cannot be removed afterwards, in which case
///   both copies exist.
#[instrument(level = "debug")]
pub fn relocate_into_repo(source: &Path, destination: &Path) -> Result<()> {
    copy_into(source, destination)?;
    remove_entry(source)
}

/// Copy file or directory tree from `source` to `destination`.
///
/// Parent directories of `destination` are created as needed. Directory trees
/// are only copied into a destination that does not exist yet.
///
/// # Errors
///
/// - Return [`RelocateError::Inspect`] if `source` cannot be found.
/// - Return [`RelocateError::DestinationExists`] if `source` is a directory,
///   and `destination` already exists.
/// - Return [`RelocateError`] if any of the underlying I/O fails.
pub fn copy_into(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|err| RelocateError::Inspect {
        source: err,
        path: source.into(),
    })?;

    if metadata.is_dir() {
        copy_tree(source, destination)
    } else {
        make_parent(destination)?;
        copy_file(source, destination)
    }
}

/// Create symlink at `link` pointing to `target`.
///
/// # Errors
///
/// - Return [`RelocateError::LinkExists`] if something already sits at
///   `link`, dangling symlinks included.
/// - Return [`RelocateError::Link`] if symlink cannot be created.
pub fn create_link(target: &Path, link: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        return Err(RelocateError::LinkExists { path: link.into() });
    }

    debug!("link {:?} -> {:?}", link.display(), target.display());
    symlink(target, link).map_err(|err| RelocateError::Link {
        source: err,
        link: link.into(),
        target: target.into(),
    })
}

/// Remove file, symlink, or directory tree at `path`.
///
/// Symlinks are removed themselves, their targets are left alone.
///
/// # Errors
///
/// - Return [`RelocateError::Remove`] if removal fails.
pub fn remove_entry(path: &Path) -> Result<()> {
    let remove = |err: io::Error| RelocateError::Remove {
        source: err,
        path: path.into(),
    };

    let metadata = path.symlink_metadata().map_err(remove)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(remove)
    } else {
        fs::remove_file(path).map_err(remove)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    if destination.symlink_metadata().is_ok() {
        return Err(RelocateError::DestinationExists {
            path: destination.into(),
        });
    }

    // INVARIANT: Visit directory contents before the directory itself.
    //   - Permission bits of a directory are applied after it is filled, so
    //     read-only directories can still be populated.
    for entry in WalkDir::new(source).follow_links(false).contents_first(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            debug!("skip symlink {:?}", entry.path().display());
        } else if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|err| RelocateError::CreateDir {
                source: err,
                path: target.clone(),
            })?;
            let permissions = entry.metadata()?.permissions();
            fs::set_permissions(&target, permissions).map_err(|err| RelocateError::Copy {
                source: err,
                from: entry.path().into(),
                to: target.clone(),
            })?;
        } else if file_type.is_file() {
            make_parent(&target)?;
            copy_file(entry.path(), &target)?;
        }
    }

    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let copy = |err: io::Error| RelocateError::Copy {
        source: err,
        from: from.into(),
        to: to.into(),
    };

    let mut input = File::open(from).map_err(copy)?;
    let mut output = File::create(to).map_err(copy)?;
    io::copy(&mut input, &mut output).map_err(copy)?;
    output.sync_all().map_err(copy)?;

    let permissions = input.metadata().map_err(copy)?.permissions();
    fs::set_permissions(to, permissions).map_err(copy)
}

fn make_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    mkdirp(parent).map_err(|err| RelocateError::CreateDir {
        source: err,
        path: parent.into(),
    })?;

    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Relocation error types.
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    /// Source cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Content or permission bits cannot be copied.
    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Directory tree destination is already occupied.
    #[error("destination {:?} already exists", path.display())]
    DestinationExists { path: PathBuf },

    /// Directory tree cannot be traversed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Entry cannot be removed.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Symlink location is already occupied.
    #[error("cannot link {:?}, path already exists", path.display())]
    LinkExists { path: PathBuf },

    /// Symlink cannot be created.
    #[error("failed to link {:?} to {:?}", link.display(), target.display())]
    Link {
        #[source]
        source: io::Error,
        link: PathBuf,
        target: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RelocateError> = std::result::Result<T, E>;
