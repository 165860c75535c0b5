// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Package list parsing.
//!
//! Utilities to parse the comment-annotated package list format that
//! describes what a machine should have installed, and which repositories
//! and signing keys the packages come from.
//!
//! # Format
//!
//! A package list is plain text, read line by line:
//!
//! - Blank lines and ordinary `#` comments are ignored.
//! - A `# repo: <value>` annotation starts a new group whose packages
//!   install from that repository, e.g. `ppa:git-core/ppa`.
//! - A `# key: <url>` annotation attaches the GPG key for the current
//!   group's repository.
//! - Every other line lists one or more whitespace separated package
//!   names, optionally followed by a trailing `# comment`.
//!
//! Packages listed before any annotation belong to a leading group with no
//! repository or key, i.e. they install straight from the OS defaults.
//!
//! Installation itself is left to the surrounding install scripts. This
//! module only decides which packages belong to which repository and key,
//! so the scripts can add repositories and fetch keys before handing the
//! package names to the package manager.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Parsed package list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageList {
    /// Package groups in listing order.
    pub groups: Vec<PackageGroup>,
}

impl PackageList {
    /// Total number of packages across all groups.
    pub fn package_count(&self) -> usize {
        self.groups.iter().map(|group| group.packages.len()).sum()
    }
}

impl FromStr for PackageList {
    type Err = PkgListError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut groups = Vec::new();
        let mut current = PackageGroup::default();

        for (index, raw) in data.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix('#') {
                let comment = comment.trim_start();
                if let Some(value) = comment.strip_prefix("repo:") {
                    let value = value.trim();
                    if value.is_empty() {
                        return Err(PkgListError::MissingValue {
                            line: index + 1,
                            annotation: "repo",
                        });
                    }

                    flush(&mut groups, &mut current);
                    current.repository = Some(value.to_owned());
                } else if let Some(value) = comment.strip_prefix("key:") {
                    let value = value.trim();
                    if value.is_empty() {
                        return Err(PkgListError::MissingValue {
                            line: index + 1,
                            annotation: "key",
                        });
                    }

                    // INVARIANT: A key annotation belongs to the group its
                    // repo annotation opened; it only starts a new group
                    // once packages have been listed.
                    if !current.packages.is_empty() {
                        flush(&mut groups, &mut current);
                    }
                    current.gpg_key = Some(value.to_owned());
                }

                continue;
            }

            let names = match line.split_once('#') {
                Some((names, _)) => names,
                None => line,
            };
            current
                .packages
                .extend(names.split_whitespace().map(str::to_owned));
        }

        flush(&mut groups, &mut current);

        Ok(Self { groups })
    }
}

impl Display for PackageList {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut first = true;
        for group in &self.groups {
            if !first {
                writeln!(fmt)?;
            }
            first = false;

            if let Some(repository) = &group.repository {
                writeln!(fmt, "# repo: {repository}")?;
            }
            if let Some(gpg_key) = &group.gpg_key {
                writeln!(fmt, "# key: {gpg_key}")?;
            }
            for package in &group.packages {
                writeln!(fmt, "{package}")?;
            }
        }

        Ok(())
    }
}

/// Packages that share a repository and signing key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageGroup {
    /// Repository the packages install from, if not the OS default.
    pub repository: Option<String>,

    /// URL of the GPG key that signs the repository.
    pub gpg_key: Option<String>,

    /// Package names.
    pub packages: Vec<String>,
}

impl PackageGroup {
    fn is_empty(&self) -> bool {
        self.repository.is_none() && self.gpg_key.is_none() && self.packages.is_empty()
    }
}

fn flush(groups: &mut Vec<PackageGroup>, current: &mut PackageGroup) {
    if !current.is_empty() {
        groups.push(std::mem::take(current));
    }
}

/// Package list error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PkgListError {
    /// Annotation with no value.
    #[error("line {line}: '{annotation}:' annotation is missing a value")]
    MissingValue { line: usize, annotation: &'static str },
}

/// Friendly result alias :3
pub type Result<T, E = PkgListError> = std::result::Result<T, E>;
