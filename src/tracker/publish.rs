// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository publishing.
//!
//! After an entry is added or removed, the repository can be committed and
//! pushed to its remote in one go. Publishing shells out to the `git` binary
//! found on the search path.

use std::{
    ffi::OsStr,
    path::Path,
    process::Command,
};
use tracing::{debug, info, instrument};

/// Kind of change being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Entry was added for tracking.
    Add,

    /// Entry was removed from tracking.
    Remove,
}

impl Action {
    /// Commit message describing `action` on `name`.
    pub fn commit_message(self, name: &str) -> String {
        match self {
            Self::Add => format!("{name}: added {name} for tracking"),
            Self::Remove => format!("{name}: removed {name} from tracking"),
        }
    }
}

/// Publish repository changes.
pub trait Publish {
    /// Stage, commit, and push every change in repository at `repo_root`.
    ///
    /// # Errors
    ///
    /// - Return [`PublishError`] if any step fails.
    fn commit_and_push(&mut self, repo_root: &Path, name: &str, action: Action) -> Result<()>;
}

/// Publish through the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitPublisher;

impl GitPublisher {
    /// Construct new git publisher.
    pub fn new() -> Self {
        Self
    }
}

impl Publish for GitPublisher {
    #[instrument(skip(self), level = "debug")]
    fn commit_and_push(&mut self, repo_root: &Path, name: &str, action: Action) -> Result<()> {
        info!("Committing changes for: {name}");
        let output = gitcall(repo_root, ["add", "-A"])?;
        debug!("{output}");

        let message = action.commit_message(name);
        let output = gitcall(repo_root, ["commit", "-a", "-m", message.as_str()])?;
        debug!("{output}");

        info!("Pushing changes to repository");
        let output = gitcall(repo_root, ["push", "origin"])?;
        debug!("{output}");

        Ok(())
    }
}

fn gitcall(
    repo_root: &Path,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();
    let output = Command::new("git")
        .current_dir(repo_root)
        .args(&args)
        .output()
        .map_err(|err| PublishError::Spawn {
            source: err,
            args: render_args(&args),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(PublishError::Git {
            args: render_args(&args),
            message,
        });
    }

    Ok(message)
}

fn render_args(args: &[impl AsRef<OsStr>]) -> String {
    args.iter()
        .map(|arg| arg.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Publishing error types.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Git binary cannot be run.
    #[error("failed to run git {args}")]
    Spawn {
        #[source]
        source: std::io::Error,
        args: String,
    },

    /// Git exited with failure.
    #[error("command git {args} failed:\n{message}")]
    Git { args: String, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = PublishError> = std::result::Result<T, E>;
