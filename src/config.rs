// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the manifest file that dot uses to remember what it
//! tracks, to simplify the process of serialization and deserialization. File
//! I/O is left to [`ManifestStore`](crate::store::ManifestStore).

use crate::path::{resolve_from_home, Layout};

use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Manifest layout.
///
/// The __manifest__ records every tracked entry by name, along with the
/// location of the repository that holds the canonical copies of those
/// entries.
///
/// # General Layout
///
/// ```json
/// {
///     "dot_path": "/dotfiles",
///     "files": {
///         "nvimrc": "/.nvimrc"
///     }
/// }
/// ```
///
/// Both `dot_path` and the values of `files` are home-relative paths. An
/// absolute `dot_path` that already points inside the home directory is
/// accepted as well. The `dot_path` may use `~` and environment variables,
/// which are only expanded when the repository root is resolved, so the
/// manifest is saved exactly as written.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Repository root holding canonical copies of tracked entries.
    pub dot_path: DotPath,

    /// Tracked entry names mapped to home-relative paths.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    /// Construct empty manifest for given repository root.
    pub fn new(dot_path: impl Into<PathBuf>) -> Self {
        Self {
            dot_path: DotPath::new(dot_path),
            files: BTreeMap::new(),
        }
    }

    /// Absolute path to repository root.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ShellExpansion`] if `dot_path` names an unset
    ///   environment variable.
    pub fn repo_root(&self, layout: &Layout) -> Result<PathBuf, ConfigError> {
        self.dot_path.resolve(layout.home())
    }

    /// Home-relative path recorded for a tracked entry.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        self.files.get(name.as_ref()).map(String::as_str)
    }

    /// Record tracked entry.
    ///
    /// Returns previously recorded path if the name was already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        relative: impl Into<String>,
    ) -> Option<String> {
        self.files.insert(name.into(), relative.into())
    }

    /// Forget tracked entry.
    pub fn remove(&mut self, name: impl AsRef<str>) -> Option<String> {
        self.files.remove(name.as_ref())
    }

    /// Check if manifest tracks nothing.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate through tracked entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(name, relative)| (name.as_str(), relative.as_str()))
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let manifest: Manifest = serde_json::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Repository root must expand, but is kept as written.
        shellexpand::full(manifest.dot_path.to_string().as_str())
            .map_err(ConfigError::ShellExpansion)?;

        Ok(manifest)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"\t");
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(ConfigError::Serialize)?;

        fmt.write_str(String::from_utf8_lossy(&buffer).as_ref())
    }
}

/// Path to repository root as written in the manifest.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotPath(PathBuf);

impl DotPath {
    /// Construct new repository root path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat repository root as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }

    /// Resolve repository root against home directory.
    ///
    /// A leading `~` expands to `home`, and environment variables are
    /// substituted. Paths already inside `home` are then kept as is,
    /// everything else is taken to be relative to `home`.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ShellExpansion`] if an environment variable
    ///   is not set.
    pub fn resolve(&self, home: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        let home = home.as_ref();
        let raw = self.0.to_string_lossy();
        let expanded = shellexpand::full_with_context(
            raw.as_ref(),
            || Some(home.to_string_lossy()),
            |var| std::env::var(var).map(Some),
        )?;

        let expanded = Path::new(expanded.as_ref());
        if expanded.starts_with(home) {
            return Ok(expanded.to_path_buf());
        }

        Ok(resolve_from_home(home, expanded.to_string_lossy()))
    }
}

impl Display for DotPath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize manifest.
    #[error("malformed manifest")]
    Deserialize(#[source] serde_json::Error),

    /// Failed to serialize manifest.
    #[error("failed to serialize manifest")]
    Serialize(#[source] serde_json::Error),

    /// Failed to perform shell expansion on manifest.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}
