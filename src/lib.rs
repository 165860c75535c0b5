// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Personal Linux desktop provisioning toolkit.
//!
//! MyLiCuLa keeps a machine's personal plumbing in place: symbolic links to
//! utility scripts and configuration files, plus the package lists that the
//! surrounding install scripts feed to the system package manager.
//!
//! The crate is organized around one core component and two supporting
//! layouts:
//!
//! - [`link`]: the symlink reconciler, an idempotent check-then-act
//!   routine with cycle and depth detection
//! - [`manifest`]: TOML layout describing the links a provisioning pass
//!   should hold in place
//! - [`pkglist`]: parser for the comment-annotated package list format

pub mod link;
pub mod manifest;
pub mod path;
pub mod pkglist;

pub use link::{LinkError, LinkRequest, Linker, Outcome, MAX_HOPS};
pub use manifest::{LinkEntry, Manifest, ManifestError, ManifestSettings};
pub use pkglist::{PackageGroup, PackageList, PkgListError};
