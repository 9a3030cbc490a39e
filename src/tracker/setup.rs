// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Machine setup.
//!
//! Get a machine ready for dot. The first machine gets a brand new manifest
//! and repository layout. Every additional machine already has the manifest
//! inside its cloned repository, and only needs it linked into the home
//! directory before everything else can be synced.

use crate::{
    config::Manifest,
    prompt::Confirm,
    tracker::{
        publish::Publish,
        relocate::{create_link, relocate_into_repo, remove_entry, RelocateError},
        Result, SyncReport, TrackError, TrackOutcome, Tracker, BACKUP_DIR, FILES_DIR,
    },
};

use mkdirp::mkdirp;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Name under which the manifest tracks itself.
pub const MANIFEST_ENTRY: &str = "dotconfig";

/// What bringing a machine up ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpOutcome {
    /// Manifest was in place, or got linked, and everything was synced.
    Synced(SyncReport),

    /// Brand new setup was created.
    Initialized(TrackOutcome),

    /// Operator did not want a new setup.
    Declined,
}

impl<C, P> Tracker<C, P>
where
    C: Confirm,
    P: Publish,
{
    /// Bring machine up from repository at `repo_dir`.
    ///
    /// Checks the following in order:
    ///
    /// 1. Manifest in home directory is a symlink: sync everything.
    /// 2. Manifest in home directory is a regular file: move it to backup,
    ///    link the repository's manifest in its place, then sync everything.
    /// 3. No manifest in home directory, but the repository has one: link
    ///    it, then sync everything.
    /// 4. No manifest anywhere: offer to set up a new machine.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError::RepoCopyMissing`] if manifest in home directory
    ///   is a regular file, but repository has no manifest.
    /// - Return [`TrackError`] if linking, syncing, or setup fails.
    #[instrument(skip(self), level = "debug")]
    pub fn up(&mut self, repo_dir: &Path) -> Result<UpOutcome> {
        info!("Setting up dot ...");
        let manifest_path = self.layout.manifest_path().to_path_buf();
        let repo_copy = repo_manifest(repo_dir, &manifest_path);

        match manifest_path.symlink_metadata() {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                info!("The manifest is present, syncing ...");
            }
            Ok(_) => {
                info!("Found manifest in home folder ...");
                if !repo_copy.exists() {
                    return Err(TrackError::RepoCopyMissing { path: repo_copy });
                }

                let backup = repo_manifest_backup(repo_dir, &manifest_path);
                if backup.symlink_metadata().is_ok() {
                    warn!("replacing previous backup {:?}", backup.display());
                    remove_entry(&backup)?;
                }
                relocate_into_repo(&manifest_path, &backup)?;
                create_link(&repo_copy, &manifest_path)?;
            }
            Err(_) if repo_copy.exists() => {
                info!("Found manifest in repository folder ...");
                create_link(&repo_copy, &manifest_path)?;
            }
            Err(_) => {
                let answer = self
                    .confirm
                    .confirm("Couldn't find the manifest, do you want to create a new one?")?;
                if !answer.is_affirmative() {
                    return Ok(UpOutcome::Declined);
                }

                let outcome = self.setup_new_machine(repo_dir)?;
                info!("You're now ready to use dot! Type 'dot --help' for help");
                return Ok(UpOutcome::Initialized(outcome));
            }
        }

        Ok(UpOutcome::Synced(self.sync_all()?))
    }

    /// Set up first machine with repository at `repo_dir`.
    ///
    /// Writes an empty manifest pointing at `repo_dir`, creates the `files`
    /// and `backup` folders, and finally tracks the manifest itself under
    /// [`MANIFEST_ENTRY`], turning it into a symlink.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError::Path`] if `repo_dir` or the manifest is not
    ///   inside home directory.
    /// - Return [`TrackError`] if manifest, folders, or tracking fails.
    #[instrument(skip(self), level = "debug")]
    pub fn setup_new_machine(&mut self, repo_dir: &Path) -> Result<TrackOutcome> {
        let dot_path = self.layout.relative_to_home(repo_dir)?;
        let manifest = Manifest::new(dot_path);

        info!("Creating new manifest: {:?}", self.store.path().display());
        self.store.save(&manifest)?;

        for folder in [FILES_DIR, BACKUP_DIR] {
            let folder = repo_dir.join(folder);
            info!("Creating folder: {:?}", folder.display());
            mkdirp(&folder).map_err(|err| RelocateError::CreateDir {
                source: err,
                path: folder.clone(),
            })?;
        }

        let manifest_path = self.layout.manifest_path().to_path_buf();
        self.track(MANIFEST_ENTRY, manifest_path, false)
    }
}

fn repo_manifest(repo_dir: &Path, manifest_path: &Path) -> PathBuf {
    repo_manifest_in(repo_dir.join(FILES_DIR), manifest_path)
}

fn repo_manifest_backup(repo_dir: &Path, manifest_path: &Path) -> PathBuf {
    repo_manifest_in(repo_dir.join(BACKUP_DIR), manifest_path)
}

fn repo_manifest_in(folder: PathBuf, manifest_path: &Path) -> PathBuf {
    let folder = folder.join(MANIFEST_ENTRY);
    match manifest_path.file_name() {
        Some(base) => folder.join(base),
        None => folder,
    }
}
