// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Symlink chain resolution.
//!
//! Walks the symlink chain rooted at a link source before anything touches
//! the filesystem. The walk simulates the link the caller asked for, so a
//! request that would close a cycle is caught while the cycle is still
//! hypothetical.

use crate::link::{LinkError, Result};

use std::{
    collections::HashSet,
    env::current_dir,
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

/// Follow the symlink chain rooted at `source`, pretending the requested
/// link at `link_path` already exists.
///
/// Chain nodes are compared on absolutized, lexically cleaned paths. The
/// walk classifies every way a chain can go wrong:
///
/// - Reaching `link_path`, or revisiting any earlier node, is a circular
///   reference.
/// - A non-repeating chain longer than `max_hops` is rejected.
/// - A chain that settles on a nonexistent entry means the source is
///   missing (this covers dangling symlinks anywhere along the chain).
///
/// On success, returns the resolved path the chain settles on.
///
/// # Errors
///
/// - Return [`LinkError::CircularReference`] if the chain revisits a node
///   or would pass through the requested link.
/// - Return [`LinkError::TooManyLevels`] if the chain exceeds `max_hops`.
/// - Return [`LinkError::SourceNotFound`] if the chain ends nowhere.
/// - Return [`LinkError::Filesystem`] if a stat or readlink fails outright.
pub(crate) fn walk_chain(source: &Path, link_path: &Path, max_hops: usize) -> Result<PathBuf> {
    let link_node = absolutize(link_path)?;
    let mut current = absolutize(source)?;
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut hops = 0;

    loop {
        // INVARIANT: The requested link is treated as if it already exists,
        // so reaching it means the new link would close a cycle.
        if current == link_node {
            return Err(LinkError::CircularReference {
                link_path: link_path.to_path_buf(),
                cycle_node: current,
            });
        }

        if !visited.insert(current.clone()) {
            return Err(LinkError::CircularReference {
                link_path: link_path.to_path_buf(),
                cycle_node: current,
            });
        }

        let metadata = match fs::symlink_metadata(&current) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(LinkError::SourceNotFound {
                    source_path: source.to_path_buf(),
                });
            }
            Err(err) => {
                return Err(LinkError::Filesystem {
                    source: err,
                    path: current,
                });
            }
        };

        if !metadata.file_type().is_symlink() {
            debug!("chain from {:?} settles at {:?}", source.display(), current.display());
            return Ok(current);
        }

        hops += 1;
        if hops > max_hops {
            return Err(LinkError::TooManyLevels {
                source_path: source.to_path_buf(),
                max_hops,
            });
        }

        let target = fs::read_link(&current).map_err(|err| LinkError::Filesystem {
            source: err,
            path: current.clone(),
        })?;

        // INVARIANT: Relative targets resolve against the link's own directory.
        current = if target.is_absolute() {
            clean(&target)
        } else {
            clean(&current.parent().unwrap_or(Path::new("/")).join(target))
        };
    }
}

/// Make a path absolute against the current working directory, then clean
/// it lexically.
///
/// Does not touch the filesystem beyond reading the working directory, so
/// it works for paths that do not exist yet.
pub(crate) fn absolutize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        current_dir()
            .map_err(|err| LinkError::Filesystem {
                source: err,
                path: path.to_path_buf(),
            })?
            .join(path)
    };

    Ok(clean(&absolute))
}

/// Lexically normalize a path: drop `.` components and fold `..` onto the
/// component before it.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::RootDir) => {}
                Some(Component::ParentDir) | None => out.push(component.as_os_str()),
                _ => {
                    out.pop();
                }
            },
            _ => out.push(component.as_os_str()),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn clean_drops_dot_components() {
        assert_eq!(clean(Path::new("/a/./b/./c")), PathBuf::from("/a/b/c"));
    }

    #[test]
    fn clean_folds_parent_components() {
        assert_eq!(clean(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("../a/b")), PathBuf::from("../a/b"));
    }

    #[sealed_test]
    fn absolutize_joins_working_directory() -> anyhow::Result<()> {
        let root = current_dir()?;
        assert_eq!(absolutize("a/b.txt")?, root.join("a/b.txt"));
        assert_eq!(absolutize("/a/b.txt")?, PathBuf::from("/a/b.txt"));
        Ok(())
    }

    #[sealed_test]
    fn walk_chain_settles_on_final_entry() -> anyhow::Result<()> {
        let root = current_dir()?;
        fs::write("base.txt", "")?;
        symlink("base.txt", "mid")?;
        symlink("mid", "top")?;

        let settled = walk_chain(Path::new("top"), Path::new("link"), 40)?;
        assert_eq!(settled, root.join("base.txt"));
        Ok(())
    }
}
