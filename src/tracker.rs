// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tracking state machine.
//!
//! A __tracked entry__ is a file or folder from the home directory whose
//! canonical copy lives in the repository, with a symlink left at its
//! original location.
//!
//! # Repository Layout
//!
//! The name of a tracked entry doubles as the name of its folder inside the
//! repository. Canonical copies sit at `<repo>/files/<name>/<basename>`.
//! Local files that had to make way for a canonical copy are kept at
//! `<repo>/backup/<name>/<basename>`, so nothing is ever thrown away.
//!
//! # Tracking States
//!
//! Tracking a path first probes three things: whether the path exists,
//! whether it is a symlink, and whether `<repo>/files/<name>` exists.
//!
//! | exists | symlink | in repo | outcome                                  |
//! |--------|---------|---------|------------------------------------------|
//! | no     | -       | -       | copy canonical copy back, then retry     |
//! | yes    | yes     | -       | nothing to do                            |
//! | yes    | no      | yes     | move local file to backup, then link     |
//! | yes    | no      | no      | move into repo, link, record in manifest |
//!
//! The third row is what happens on an additional machine, where the
//! repository was cloned, but the home directory still holds its own
//! versions of tracked files.
//!
//! Every operation loads the manifest fresh from disk, so repeated runs are
//! idempotent, and a sync saves and reloads the manifest once per entry.
//!
//! # See Also
//!
//! 1. [`relocate`]
//! 2. [`publish`]
//! 3. [`setup`]

pub mod publish;
pub mod relocate;
pub mod setup;

use crate::{
    config::ConfigError,
    path::{Layout, PathError},
    prompt::{Answer, Confirm, InquireConfirm, PromptError},
    store::{ManifestStore, StoreError},
    tracker::{
        publish::{Action, GitPublisher, Publish, PublishError},
        relocate::{copy_into, create_link, relocate_into_repo, remove_entry, RelocateError},
    },
};

use std::path::{Component, Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// Repository folder holding canonical copies of tracked entries.
pub const FILES_DIR: &str = "files";

/// Repository folder holding displaced local copies of tracked entries.
pub const BACKUP_DIR: &str = "backup";

/// Dotfile tracker.
///
/// Drives relocation of files into the repository, and keeps the manifest
/// in step. Questions for the operator go through `C`, publishing goes
/// through `P`.
#[derive(Debug)]
pub struct Tracker<C = InquireConfirm, P = GitPublisher>
where
    C: Confirm,
    P: Publish,
{
    pub(crate) layout: Layout,
    pub(crate) store: ManifestStore,
    confirm: C,
    publisher: P,
}

impl<C, P> Tracker<C, P>
where
    C: Confirm,
    P: Publish,
{
    /// Construct new tracker.
    pub fn new(layout: Layout, confirm: C, publisher: P) -> Self {
        let store = ManifestStore::new(layout.manifest_path());
        Self {
            layout,
            store,
            confirm,
            publisher,
        }
    }

    /// Filesystem locations used by tracker.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Track file or folder at `path` under `name`.
    ///
    /// Running this again with the same arguments is a no-op, because the
    /// path is a symlink by then.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError::InvalidName`] if `name` cannot be a folder name.
    /// - Return [`TrackError::AlreadyTracked`] if `name` is recorded for a
    ///   different path.
    /// - Return [`TrackError::NotFound`] if `path` is missing, and there is no
    ///   canonical copy to restore it from.
    /// - Return [`TrackError::RepoCopyMissing`] if the repository folder for
    ///   `name` exists, but holds no canonical copy of `path`.
    /// - Return [`TrackError::Path`] if `path` is not inside home directory.
    /// - Return [`TrackError`] if manifest, relocation, prompt, or publishing
    ///   fails.
    pub fn track(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        push: bool,
    ) -> Result<TrackOutcome> {
        let session = SyncSession::default();
        let (outcome, _) = self.track_in_session(name, path.as_ref(), push, session)?;
        Ok(outcome)
    }

    /// Stop tracking `name`, putting its canonical copy back in place.
    ///
    /// Refuses to touch the recorded path unless it is a symlink, so that
    /// unrelated data is never overwritten.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError::NotTracked`] if manifest has no entry `name`.
    /// - Return [`TrackError::NotFound`] if recorded path does not exist.
    /// - Return [`TrackError::NotASymlink`] if recorded path is not a symlink.
    /// - Return [`TrackError::RepoCopyMissing`] if canonical copy is missing.
    /// - Return [`TrackError`] if manifest, relocation, or publishing fails.
    #[instrument(skip(self), level = "debug")]
    pub fn untrack(&mut self, name: &str, push: bool) -> Result<()> {
        let mut manifest = self.store.load()?;
        let relative = manifest
            .get(name)
            .ok_or_else(|| TrackError::NotTracked { name: name.into() })?
            .to_owned();
        let path = self.layout.resolve(&relative);

        let metadata = path
            .symlink_metadata()
            .map_err(|_| TrackError::NotFound { path: path.clone() })?;
        if !metadata.file_type().is_symlink() {
            return Err(TrackError::NotASymlink { path });
        }

        let repo_root = manifest.repo_root(&self.layout)?;
        let entry = EntryPaths::new(&repo_root, name, &path)?;
        if !entry.canonical.exists() {
            return Err(TrackError::RepoCopyMissing {
                path: entry.canonical,
            });
        }

        info!("Moving {name} back to {:?}", path.display());
        remove_entry(&path)?;
        copy_into(&entry.canonical, &path).inspect_err(|_| {
            error!(
                "symlink {:?} was removed, canonical copy is still at {:?}",
                path.display(),
                entry.canonical.display()
            );
        })?;
        remove_entry(&entry.repo_dir)?;

        manifest.remove(name);
        self.store.save(&manifest)?;

        if push {
            self.publisher
                .commit_and_push(&repo_root, name, Action::Remove)?;
        }

        Ok(())
    }

    /// Reconcile every entry of the manifest.
    ///
    /// Entries are tracked one by one in name order. Problems specific to one
    /// entry are reported and the entry is skipped. Anything else aborts the
    /// whole sync, after logging which entries were already changed.
    ///
    /// Answering [`Answer::All`] to a question sticks for the rest of the run.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError`] if manifest cannot be loaded, or if an entry
    ///   fails in a way that is not specific to that entry.
    #[instrument(skip(self), level = "debug")]
    pub fn sync_all(&mut self) -> Result<SyncReport> {
        info!("Syncing files ...");
        let manifest = self.store.load()?;
        let mut report = SyncReport::default();

        if manifest.is_empty() {
            warn!("there aren't any files being tracked, begin doing so with `dot add`");
            return Ok(report);
        }

        let mut session = SyncSession::default();
        for (name, relative) in manifest.entries() {
            let path = self.layout.resolve(relative);
            match self.track_in_session(name, &path, false, session) {
                Ok((outcome, next)) => {
                    session = next;
                    report.record(name, outcome);
                }
                Err(err) if err.is_validation() => {
                    warn!("{name}: {err}");
                    report.skipped.push(name.into());
                }
                Err(err) => {
                    if !report.changed.is_empty() {
                        error!(
                            "sync aborted at {name}, entries already changed: {}",
                            report.changed.join(", ")
                        );
                    }
                    return Err(err);
                }
            }
        }

        Ok(report)
    }

    /// List tracked entries with their absolute paths.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError::Store`] if manifest cannot be loaded.
    pub fn list(&self) -> Result<Vec<TrackedEntry>> {
        let manifest = self.store.load()?;
        Ok(manifest
            .entries()
            .map(|(name, relative)| TrackedEntry {
                name: name.into(),
                path: self.layout.resolve(relative),
            })
            .collect())
    }

    #[instrument(skip(self, session), level = "debug")]
    fn track_in_session(
        &mut self,
        name: &str,
        path: &Path,
        push: bool,
        mut session: SyncSession,
    ) -> Result<(TrackOutcome, SyncSession)> {
        validate_name(name)?;
        let manifest = self.store.load()?;
        let relative = self.layout.relative_to_home(path)?;
        if relative.is_empty() {
            return Err(PathError::NotUnderHome { path: path.into() }.into());
        }

        // INVARIANT: One name maps to one path.
        if let Some(recorded) = manifest.get(name) {
            if recorded != relative {
                return Err(TrackError::AlreadyTracked {
                    name: name.into(),
                    recorded: recorded.into(),
                });
            }
        }

        let repo_root = manifest.repo_root(&self.layout)?;
        let entry = EntryPaths::new(&repo_root, name, path)?;

        let mut materialized = false;
        loop {
            match entry.probe() {
                Probe::Missing if materialized => {
                    return Err(TrackError::NotFound { path: entry.path });
                }
                Probe::Missing => match self.materialize(name, &entry, session)? {
                    Some(next) => {
                        session = next;
                        materialized = true;
                    }
                    None => return Ok((TrackOutcome::Skipped, session)),
                },
                Probe::Linked => {
                    info!("{name} is already symlinked");
                    return Ok((TrackOutcome::AlreadyLinked, session));
                }
                Probe::Collision => return self.relink(name, &entry, session),
                Probe::Fresh => {
                    info!("Symlinking: {name}");
                    relocate_into_repo(&entry.path, &entry.canonical)?;
                    link_or_report(name, &entry)?;

                    let mut manifest = manifest;
                    manifest.insert(name, relative);
                    self.store.save(&manifest)?;

                    if push {
                        self.publisher
                            .commit_and_push(&repo_root, name, Action::Add)?;
                    }

                    return Ok((TrackOutcome::Added, session));
                }
            }
        }
    }

    /// Copy canonical copy back to a missing path.
    ///
    /// Returns `None` if the operator declined.
    fn materialize(
        &mut self,
        name: &str,
        entry: &EntryPaths,
        mut session: SyncSession,
    ) -> Result<Option<SyncSession>> {
        warn!("file not present on system: {:?}", entry.path.display());
        if !entry.canonical.exists() {
            return Err(TrackError::NotFound {
                path: entry.path.clone(),
            });
        }

        if !session.copy_all {
            let question = format!("Copy {name} to {:?}?", entry.path.display());
            match self.confirm.confirm(&question)? {
                Answer::All => session.copy_all = true,
                Answer::Yes => {}
                Answer::No => {
                    warn!("ignoring {name}");
                    return Ok(None);
                }
            }
        }

        // INVARIANT: Dangling symlinks count as missing, clear them first.
        if entry.path.symlink_metadata().is_ok() {
            remove_entry(&entry.path)?;
        }
        copy_into(&entry.canonical, &entry.path)?;

        Ok(Some(session))
    }

    /// Move local copy to backup, and link canonical copy in its place.
    fn relink(
        &mut self,
        name: &str,
        entry: &EntryPaths,
        mut session: SyncSession,
    ) -> Result<(TrackOutcome, SyncSession)> {
        if !entry.canonical.exists() {
            return Err(TrackError::RepoCopyMissing {
                path: entry.canonical.clone(),
            });
        }

        info!("Symlinking: {name}");
        if entry.backup.symlink_metadata().is_ok() {
            warn!("backup {:?} already exists", entry.backup.display());
            if !session.replace_backups {
                let question = format!("Remove {:?}?", entry.backup.display());
                match self.confirm.confirm(&question)? {
                    Answer::All => session.replace_backups = true,
                    Answer::Yes => {}
                    Answer::No => {
                        warn!("ignoring {name}");
                        return Ok((TrackOutcome::Skipped, session));
                    }
                }
            }
            remove_entry(&entry.backup)?;
        }

        relocate_into_repo(&entry.path, &entry.backup)?;
        link_or_report(name, entry)?;

        Ok((
            TrackOutcome::Relinked {
                backup: entry.backup.clone(),
            },
            session,
        ))
    }
}

/// Decisions that carry over between entries of one sync.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSession {
    /// Restore every missing file without asking.
    pub copy_all: bool,

    /// Replace every occupied backup slot without asking.
    pub replace_backups: bool,
}

/// What tracking did to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// New entry moved into repository, linked, and recorded.
    Added,

    /// Local copy moved to backup, and canonical copy linked in its place.
    Relinked { backup: PathBuf },

    /// Path was a symlink already.
    AlreadyLinked,

    /// Operator chose to leave entry alone.
    Skipped,
}

/// Summary of a sync.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries whose path was replaced by a symlink.
    pub changed: Vec<String>,

    /// Entries that needed nothing.
    pub unchanged: Vec<String>,

    /// Entries left alone, by choice or because of a problem.
    pub skipped: Vec<String>,
}

impl SyncReport {
    fn record(&mut self, name: &str, outcome: TrackOutcome) {
        match outcome {
            TrackOutcome::Added | TrackOutcome::Relinked { .. } => self.changed.push(name.into()),
            TrackOutcome::AlreadyLinked => self.unchanged.push(name.into()),
            TrackOutcome::Skipped => self.skipped.push(name.into()),
        }
    }
}

/// Tracked entry as listed to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntry {
    /// Name of entry.
    pub name: String,

    /// Absolute path of entry.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Missing,
    Linked,
    Collision,
    Fresh,
}

/// Locations involved in tracking one entry.
#[derive(Debug, Clone)]
struct EntryPaths {
    path: PathBuf,
    repo_dir: PathBuf,
    canonical: PathBuf,
    backup: PathBuf,
}

impl EntryPaths {
    fn new(repo_root: &Path, name: &str, path: &Path) -> Result<Self> {
        // INVARIANT: Trailing separators do not count.
        let path = path.components().collect::<PathBuf>();
        let base = path
            .file_name()
            .ok_or_else(|| PathError::NotUnderHome { path: path.clone() })?;
        let repo_dir = repo_root.join(FILES_DIR).join(name);
        let canonical = repo_dir.join(base);
        let backup = repo_root.join(BACKUP_DIR).join(name).join(base);

        Ok(Self {
            path,
            repo_dir,
            canonical,
            backup,
        })
    }

    fn probe(&self) -> Probe {
        if !self.path.exists() {
            return Probe::Missing;
        }

        let is_symlink = self
            .path
            .symlink_metadata()
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            Probe::Linked
        } else if self.repo_dir.exists() {
            Probe::Collision
        } else {
            Probe::Fresh
        }
    }
}

fn link_or_report(name: &str, entry: &EntryPaths) -> Result<()> {
    create_link(&entry.canonical, &entry.path).map_err(|err| {
        error!(
            "{name} was moved out of {:?}, but could not be linked back",
            entry.path.display()
        );
        err.into()
    })
}

fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(TrackError::InvalidName { name: name.into() }),
    }
}

/// Tracking error types.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// Name cannot be used as a folder name in the repository.
    #[error("{name:?} is not a valid entry name")]
    InvalidName { name: String },

    /// Name is already recorded for another path.
    #[error("'{name}' is already tracked for {recorded:?}")]
    AlreadyTracked { name: String, recorded: String },

    /// Name is not recorded in the manifest.
    #[error("'{name}' is not being tracked, get the list of tracked files with `dot list`")]
    NotTracked { name: String },

    /// Path does not exist.
    #[error("not able to find {:?}", path.display())]
    NotFound { path: PathBuf },

    /// Path exists, but is not a symlink.
    #[error("{:?} is not a symlink", path.display())]
    NotASymlink { path: PathBuf },

    /// Canonical copy is missing from repository.
    #[error("not able to find {:?} in repository", path.display())]
    RepoCopyMissing { path: PathBuf },

    /// Path resolution fails.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Manifest cannot be loaded or saved.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Repository root in manifest cannot be expanded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File relocation fails.
    #[error(transparent)]
    Relocate(#[from] RelocateError),

    /// Publishing fails.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Operator cannot be asked.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl TrackError {
    /// Check if error only concerns the entry at hand.
    ///
    /// Validation errors are raised before anything is changed on disk.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. }
                | Self::AlreadyTracked { .. }
                | Self::NotTracked { .. }
                | Self::NotFound { .. }
                | Self::NotASymlink { .. }
                | Self::RepoCopyMissing { .. }
                | Self::Path(_)
                | Self::Store(StoreError::NotFound { .. })
        )
    }
}

/// Friendly result alias :3
pub type Result<T, E = TrackError> = std::result::Result<T, E>;
