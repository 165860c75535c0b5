// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Manifest layout.
//!
//! Specify the layout of the link manifest that MyLiCuLa uses to drive a
//! provisioning pass, to simplify the process of serialization and
//! deserialization. File I/O is left to the caller to figure out.
//!
//! # General Layout
//!
//! A manifest is composed of two basic parts: settings and link entries.
//! The settings section describes the provisioning pass itself. Each
//! `[[link]]` entry names one symlink the pass should hold in place, or a
//! whole family of them when the source is a glob pattern aimed at a
//! target directory.

use crate::link::LinkRequest;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};
use tracing::warn;

/// Link manifest layout.
///
/// Lists every symlink a provisioning pass should reconcile. Path fields
/// go through shell expansion during parsing, so entries can lean on `~`
/// and environment variables the same way the surrounding shell scripts
/// always have.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Settings for the provisioning pass.
    pub settings: ManifestSettings,

    /// Listing of links to reconcile.
    #[serde(rename = "link")]
    pub links: Option<Vec<LinkEntry>>,
}

impl Manifest {
    /// Lower every entry into concrete link requests, in listing order.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::AmbiguousTarget`] if an entry does not set
    ///   exactly one of `target` and `target_dir`.
    /// - Return [`ManifestError::Pattern`] if a glob pattern does not parse.
    /// - Return [`ManifestError::Glob`] if a glob match cannot be read.
    pub fn requests(&self) -> Result<Vec<LinkRequest>> {
        let mut requests = Vec::new();
        if let Some(links) = &self.links {
            for entry in links {
                requests.extend(entry.requests()?);
            }
        }

        Ok(requests)
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut manifest: Manifest = toml::de::from_str(data).map_err(ManifestError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(links) = manifest.links.as_mut() {
            for entry in links {
                entry.source = expand(&entry.source)?;
                if let Some(target) = entry.target.take() {
                    entry.target = Some(PathBuf::from(expand(target.to_string_lossy().as_ref())?));
                }
                if let Some(target_dir) = entry.target_dir.take() {
                    entry.target_dir =
                        Some(PathBuf::from(expand(target_dir.to_string_lossy().as_ref())?));
                }
            }
        }

        Ok(manifest)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ManifestError::Serialize)?
                .as_str(),
        )
    }
}

/// Manifest settings.
///
/// Standard settings for the provisioning pass as a whole.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ManifestSettings {
    /// Brief description of what the manifest provisions.
    pub description: String,
}

/// One desired link, or a family of them.
///
/// Exactly one of `target` and `target_dir` must be set. A `target` entry
/// maps the source to a single link path, keeping the source exactly as
/// written so relative link targets survive round trips. A `target_dir`
/// entry treats the source as a glob pattern and links every match into
/// the directory under its own file name.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkEntry {
    /// Path the link should point at. Glob patterns are only meaningful
    /// together with `target_dir`.
    pub source: String,

    /// Path the symbolic link should exist at.
    pub target: Option<PathBuf>,

    /// Directory that every glob match gets linked into.
    pub target_dir: Option<PathBuf>,
}

impl LinkEntry {
    /// Lower this entry into concrete link requests.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::AmbiguousTarget`] if the entry does not
    ///   set exactly one of `target` and `target_dir`.
    /// - Return [`ManifestError::Pattern`] if the glob pattern does not
    ///   parse.
    /// - Return [`ManifestError::Glob`] if a glob match cannot be read.
    pub fn requests(&self) -> Result<Vec<LinkRequest>> {
        match (&self.target, &self.target_dir) {
            (Some(target), None) => Ok(vec![LinkRequest::new(&self.source, target)]),
            (None, Some(target_dir)) => {
                let mut requests = Vec::new();
                for entry in glob::glob(&self.source).map_err(ManifestError::Pattern)? {
                    let path = entry.map_err(ManifestError::Glob)?;
                    let Some(name) = path.file_name() else {
                        warn!("glob match {:?} has no file name, skipped", path.display());
                        continue;
                    };
                    requests.push(LinkRequest::new(&path, target_dir.join(name)));
                }

                Ok(requests)
            }
            _ => Err(ManifestError::AmbiguousTarget {
                entry_source: self.source.clone(),
            }),
        }
    }
}

fn expand(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)
        .map_err(ManifestError::ShellExpansion)?
        .into_owned())
}

/// Manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Failed to deserialize manifest.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize manifest.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on manifest.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Glob pattern in a link entry does not parse.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Glob match cannot be read.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// Link entry must set exactly one of target and target_dir.
    #[error("link entry for {entry_source:?} must set exactly one of target and target_dir")]
    AmbiguousTarget { entry_source: String },
}

impl From<ManifestError> for FmtError {
    fn from(_: ManifestError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ManifestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs;

    #[sealed_test(env = [("MYLICULA_BIN", "/home/blah/bin")])]
    fn deserialize_manifest() -> anyhow::Result<()> {
        let result: Manifest = r#"
            [settings]
            description = "blah blah blah"

            [[link]]
            source = "/home/blah/scripts/backup.sh"
            target = "$MYLICULA_BIN/backup"

            [[link]]
            source = "/home/blah/scripts/*.sh"
            target_dir = "$MYLICULA_BIN"
        "#
        .parse()?;

        let expect = Manifest {
            settings: ManifestSettings {
                description: "blah blah blah".into(),
            },
            links: Some(vec![
                LinkEntry {
                    source: "/home/blah/scripts/backup.sh".into(),
                    target: Some(PathBuf::from("/home/blah/bin/backup")),
                    target_dir: None,
                },
                LinkEntry {
                    source: "/home/blah/scripts/*.sh".into(),
                    target: None,
                    target_dir: Some(PathBuf::from("/home/blah/bin")),
                },
            ]),
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_manifest() {
        let result = Manifest {
            settings: ManifestSettings {
                description: "blah blah blah".into(),
            },
            links: Some(vec![LinkEntry {
                source: "/home/blah/scripts/backup.sh".into(),
                target: Some(PathBuf::from("/home/blah/bin/backup")),
                target_dir: None,
            }]),
        }
        .to_string();

        let expect = indoc! {r#"
            [settings]
            description = "blah blah blah"

            [[link]]
            source = "/home/blah/scripts/backup.sh"
            target = "/home/blah/bin/backup"
        "#};

        assert_eq!(result, expect);
    }

    #[sealed_test]
    fn glob_entries_fan_out() -> anyhow::Result<()> {
        fs::create_dir("scripts")?;
        fs::write("scripts/one.sh", "")?;
        fs::write("scripts/two.sh", "")?;
        fs::write("scripts/readme.md", "")?;

        let entry = LinkEntry {
            source: "scripts/*.sh".into(),
            target: None,
            target_dir: Some(PathBuf::from("bin")),
        };

        let mut requests = entry.requests()?;
        requests.sort_by(|a, b| a.link_path.cmp(&b.link_path));
        let expect = vec![
            LinkRequest::new("scripts/one.sh", "bin/one.sh"),
            LinkRequest::new("scripts/two.sh", "bin/two.sh"),
        ];
        assert_eq!(requests, expect);

        Ok(())
    }

    #[test]
    fn entry_must_pick_one_target() {
        let neither = LinkEntry {
            source: "a".into(),
            target: None,
            target_dir: None,
        };
        assert!(matches!(
            neither.requests().unwrap_err(),
            ManifestError::AmbiguousTarget { .. }
        ));

        let both = LinkEntry {
            source: "a".into(),
            target: Some(PathBuf::from("b")),
            target_dir: Some(PathBuf::from("c")),
        };
        assert!(matches!(
            both.requests().unwrap_err(),
            ManifestError::AmbiguousTarget { .. }
        ));
    }
}
