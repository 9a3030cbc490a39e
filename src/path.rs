// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the manifest lives, and translate between absolute paths
//! and the home-relative form stored in the manifest. Home-relative paths
//! always keep their leading separator, e.g., `/home/u/.config/nvim` becomes
//! `/.config/nvim`, so that the absolute path is simply the home directory
//! with the relative path appended.

use std::path::{Component, Path, PathBuf};

/// Name of the manifest file placed in the user's home directory.
pub const MANIFEST_FILE_NAME: &str = ".dotconfig";

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf, NoWayHome> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Strip the home directory from an absolute path.
///
/// Comparison happens on whole path components, so `/home/user2` is not
/// considered to be under `/home/user`. The result keeps a leading `/`, and
/// is empty when `path` is the home directory itself.
///
/// # Errors
///
/// - Return [`PathError::NotUnderHome`] if `path` does not begin with `home`,
///   or walks back out of it through `..`.
/// - Return [`PathError::Ambiguous`] if the components of `home` occur again
///   after the home prefix.
pub fn relative_to_home(home: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<String> {
    let (home, path) = (home.as_ref(), path.as_ref());
    let rest = path
        .strip_prefix(home)
        .map_err(|_| PathError::NotUnderHome { path: path.into() })?;

    let rest = rest.components().collect::<Vec<_>>();
    if rest
        .iter()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(PathError::NotUnderHome { path: path.into() });
    }

    // INVARIANT: Home must appear exactly once, as the prefix.
    let home_parts = home
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect::<Vec<_>>();
    if !home_parts.is_empty()
        && rest
            .windows(home_parts.len())
            .any(|window| window == home_parts.as_slice())
    {
        return Err(PathError::Ambiguous { path: path.into() });
    }

    Ok(rest.iter().fold(String::new(), |mut relative, component| {
        relative.push('/');
        relative.push_str(component.as_os_str().to_string_lossy().as_ref());
        relative
    }))
}

/// Prepend home directory to a home-relative path.
pub fn resolve_from_home(home: impl AsRef<Path>, relative: impl AsRef<str>) -> PathBuf {
    let relative = relative.as_ref().trim_start_matches('/');
    if relative.is_empty() {
        return home.as_ref().to_path_buf();
    }

    home.as_ref().join(relative)
}

/// Make `path` absolute against `cwd`, folding away `.` and `..`.
///
/// Works on path text alone, so symlinks along the way are not followed.
/// A `..` at the filesystem root stays at the root.
pub fn absolute_from(cwd: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let joined = cwd.as_ref().join(path);
    let mut normal = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }

    normal
}

/// Filesystem locations dot operates on.
///
/// Bundles the user's home directory together with the location of the
/// manifest, which normally sits at `~/.dotconfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
    manifest: PathBuf,
}

impl Layout {
    /// Construct new layout from explicit locations.
    pub fn new(home: impl Into<PathBuf>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            manifest: manifest.into(),
        }
    }

    /// Construct layout with the manifest at its default place inside `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let manifest = home.join(MANIFEST_FILE_NAME);
        Self { home, manifest }
    }

    /// Construct layout for the current user.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if home directory path cannot be determined.
    pub fn try_default() -> Result<Self, NoWayHome> {
        Ok(Self::with_home(home_dir()?))
    }

    /// Absolute path to home directory.
    pub fn home(&self) -> &Path {
        self.home.as_path()
    }

    /// Absolute path to manifest file.
    pub fn manifest_path(&self) -> &Path {
        self.manifest.as_path()
    }

    /// Home-relative form of an absolute path.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::NotUnderHome`] or [`PathError::Ambiguous`], see
    ///   [`relative_to_home`].
    pub fn relative_to_home(&self, path: impl AsRef<Path>) -> Result<String> {
        relative_to_home(&self.home, path)
    }

    /// Absolute form of a home-relative path.
    pub fn resolve(&self, relative: impl AsRef<str>) -> PathBuf {
        resolve_from_home(&self.home, relative)
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Path resolution error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// Path does not live inside the home directory.
    #[error("{:?} is not inside the home directory", path.display())]
    NotUnderHome { path: PathBuf },

    /// Home directory shows up more than once in the path.
    #[error("{:?} contains the home directory more than once", path.display())]
    Ambiguous { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
