// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest storage.
//!
//! The manifest is loaded fresh from disk at the start of every operation,
//! and written back right after each mutation. Nothing is cached between
//! operations, so the file on disk is always the source of truth.
//!
//! # Torn Writes
//!
//! Saving is a plain truncate and write through the manifest path. Once the
//! manifest itself is tracked, that path is a symlink into the repository,
//! and writing through it keeps the link intact. A crash mid-write can leave
//! a truncated manifest behind, which then fails to load with
//! [`StoreError::Parse`].

use crate::config::{ConfigError, Manifest};

use std::{
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Load and save the manifest at a fixed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Construct new manifest store for given manifest path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to manifest file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Load manifest from disk.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotFound`] if manifest does not exist.
    /// - Return [`StoreError::Read`] if manifest cannot be read.
    /// - Return [`StoreError::Parse`] if manifest is malformed.
    pub fn load(&self) -> Result<Manifest> {
        debug!("load manifest {:?}", self.path.display());
        let content = read_to_string(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: self.path.clone(),
            },
            _ => StoreError::Read {
                source: err,
                path: self.path.clone(),
            },
        })?;

        content.parse().map_err(|err| StoreError::Parse {
            source: err,
            path: self.path.clone(),
        })
    }

    /// Save manifest to disk, replacing previous content.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Write`] if manifest cannot be written.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        debug!("save manifest {:?}", self.path.display());
        write(&self.path, manifest.to_string().as_bytes()).map_err(|err| StoreError::Write {
            source: err,
            path: self.path.clone(),
        })
    }

    /// Check if manifest exists, following symlinks.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Manifest storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Manifest file does not exist.
    #[error("manifest not found at {:?}", path.display())]
    NotFound { path: PathBuf },

    /// Manifest file cannot be read from.
    #[error("failed to read manifest at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest file cannot be written to.
    #[error("failed to write manifest at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest file content is malformed.
    #[error("failed to parse manifest at {:?}", path.display())]
    Parse {
        #[source]
        source: ConfigError,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
