// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevant path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::PathBuf;

/// Determine default absolute path to the link manifest.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/mylicula/manifest.toml`
/// as the default absolute path for the manifest. Does not check if the
/// path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_manifest_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("mylicula").join("manifest.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
