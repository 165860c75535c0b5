// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Symlink reconciliation.
//!
//! The __reconciler__ makes a link path a symbolic link to a source path,
//! reporting one of a small set of outcomes and never destroying anything
//! it does not itself manage as a link.
//!
//! # Check Then Act
//!
//! Every call is a single-shot decision tree over filesystem state that is
//! read fresh on each invocation. Three preconditions run before anything
//! is written:
//!
//! 1. The source must resolve, through any finite symlink chain, to an
//!    existing entry. A dangling chain fails the call.
//! 2. The requested link is simulated during that resolution, so a request
//!    that would close a cycle through pre-existing links, including a
//!    direct self-reference, fails before the cycle can come to exist.
//! 3. The chain must stay within [`MAX_HOPS`] hops.
//!
//! Only after all three pass does the reconciler look at the link path and
//! decide between creating, updating, skipping, or refusing. Failures never
//! leave partial state behind; even parent directories are created only
//! once the preconditions hold.
//!
//! # Safety Invariant
//!
//! An existing entry at the link path that is not a symlink is never
//! removed or overwritten, no matter what it contains. The only entry the
//! reconciler will ever delete is a symlink it is about to replace.
//!
//! # Raw Versus Resolved Targets
//!
//! Deciding whether an existing link is "already correct" compares the raw,
//! unresolved `readlink` value against the requested source exactly as
//! written, so intentionally relative targets stay stable across repeated
//! runs. Cycle detection instead compares absolutized chain nodes. These
//! are different comparisons on purpose; collapsing them would either break
//! idempotence for relative targets or let cycles through.

pub mod report;

mod resolve;

use crate::link::report::{ConsoleSink, StatusSink};

use std::{
    fs,
    io::ErrorKind,
    os::unix::fs::symlink,
    path::PathBuf,
};
use tracing::{debug, instrument};

/// Maximum symlink hops followed before a chain is rejected.
///
/// Mirrors the loop limit most kernels enforce during path resolution.
pub const MAX_HOPS: usize = 40;

/// One desired symlink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRequest {
    /// Path the link should point at.
    ///
    /// May be absolute or relative to the current working directory, and
    /// may itself be a symlink as long as its chain is finite.
    pub source: PathBuf,

    /// Path the symbolic link should exist at afterward.
    ///
    /// Parent directories need not exist yet.
    pub link_path: PathBuf,
}

impl LinkRequest {
    /// Construct new link request.
    pub fn new(source: impl Into<PathBuf>, link_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            link_path: link_path.into(),
        }
    }
}

/// What a reconciliation call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Link did not exist and was created.
    Created,

    /// Link existed but pointed elsewhere, and was replaced.
    Updated,

    /// Link already pointed at the requested source. Nothing was touched.
    Skipped,
}

impl Outcome {
    /// Exit code for CLI wrappers.
    ///
    /// Links that were written exit 0. A no-op exits 2 so callers can
    /// branch on "nothing to do". Failures are the caller's to map (1).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Created | Self::Updated => 0,
            Self::Skipped => 2,
        }
    }
}

/// Symlink reconciler.
///
/// Holds the per-run configuration that the original shell scripts kept in
/// process-wide variables: the verbosity flag and the sink that status
/// lines go to. Stateless between calls; reconciling is safe to repeat.
pub struct Linker<S = ConsoleSink>
where
    S: StatusSink,
{
    verbose: bool,
    sink: S,
}

impl Linker<ConsoleSink> {
    /// Construct new reconciler printing status lines to stdout.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            sink: ConsoleSink,
        }
    }
}

impl Default for Linker<ConsoleSink> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<S> Linker<S>
where
    S: StatusSink,
{
    /// Construct new reconciler with a custom status sink.
    pub fn with_sink(verbose: bool, sink: S) -> Self {
        Self { verbose, sink }
    }

    /// Make `request.link_path` a symbolic link to `request.source`.
    ///
    /// Idempotent: repeating a successful call with unchanged filesystem
    /// state yields [`Outcome::Skipped`] and writes nothing.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::SourceNotFound`] if the source resolves to
    ///   nothing.
    /// - Return [`LinkError::CircularReference`] if creating the link would
    ///   form a symlink cycle.
    /// - Return [`LinkError::TooManyLevels`] if the source's chain exceeds
    ///   [`MAX_HOPS`].
    /// - Return [`LinkError::NotASymlink`] if something other than a
    ///   symlink already occupies the link path. The entry is left alone.
    /// - Return [`LinkError::Filesystem`] if directory creation, link
    ///   creation, or link removal fails.
    #[instrument(skip(self), level = "debug")]
    pub fn reconcile(&self, request: &LinkRequest) -> Result<Outcome> {
        let outcome = self.try_reconcile(request);
        match &outcome {
            Ok(outcome) => self.report_outcome(*outcome, request),
            Err(error) => self.report_error(error),
        }

        outcome
    }

    fn try_reconcile(&self, request: &LinkRequest) -> Result<Outcome> {
        resolve::walk_chain(&request.source, &request.link_path, MAX_HOPS)?;

        let metadata = match fs::symlink_metadata(&request.link_path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.create(request)?;
                return Ok(Outcome::Created);
            }
            Err(err) => {
                return Err(LinkError::Filesystem {
                    source: err,
                    path: request.link_path.clone(),
                });
            }
        };

        if !metadata.file_type().is_symlink() {
            return Err(LinkError::NotASymlink {
                link_path: request.link_path.clone(),
            });
        }

        let existing = fs::read_link(&request.link_path).map_err(|err| LinkError::Filesystem {
            source: err,
            path: request.link_path.clone(),
        })?;

        // INVARIANT: Compare the raw stored target, never a resolved form,
        // so intentionally relative targets stay idempotent.
        if existing == request.source {
            debug!("link {:?} already correct", request.link_path.display());
            return Ok(Outcome::Skipped);
        }

        debug!(
            "link {:?} points at {:?}, replacing",
            request.link_path.display(),
            existing.display()
        );
        fs::remove_file(&request.link_path).map_err(|err| LinkError::Filesystem {
            source: err,
            path: request.link_path.clone(),
        })?;
        symlink(&request.source, &request.link_path).map_err(|err| LinkError::Filesystem {
            source: err,
            path: request.link_path.clone(),
        })?;

        Ok(Outcome::Updated)
    }

    fn create(&self, request: &LinkRequest) -> Result<()> {
        if let Some(parent) = request
            .link_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            mkdirp::mkdirp(parent).map_err(|err| LinkError::Filesystem {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        symlink(&request.source, &request.link_path).map_err(|err| LinkError::Filesystem {
            source: err,
            path: request.link_path.clone(),
        })?;

        Ok(())
    }

    fn report_outcome(&self, outcome: Outcome, request: &LinkRequest) {
        if !self.verbose {
            return;
        }

        let line = match outcome {
            Outcome::Created => format!(
                "[OK] created link {} -> {}",
                request.link_path.display(),
                request.source.display()
            ),
            Outcome::Updated => format!(
                "[UPDATE] link {} pointed at the wrong target, now -> {}",
                request.link_path.display(),
                request.source.display()
            ),
            Outcome::Skipped => format!(
                "[SKIP] link {} already points at {}",
                request.link_path.display(),
                request.source.display()
            ),
        };

        self.sink.status(&line);
    }

    fn report_error(&self, error: &LinkError) {
        if !self.verbose {
            return;
        }

        self.sink.status(&format!("[ERROR] {error}"));
    }
}

/// All possible reconciliation failures.
///
/// Every failure is terminal for the call and leaves the filesystem exactly
/// as it was found.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Link source cannot be resolved to an existing entry.
    #[error("link source {:?} does not exist", source_path.display())]
    SourceNotFound { source_path: PathBuf },

    /// Creating the link would produce a circular symlink chain.
    #[error(
        "creating link {:?} would form a circular reference through {:?}",
        link_path.display(),
        cycle_node.display()
    )]
    CircularReference {
        link_path: PathBuf,
        cycle_node: PathBuf,
    },

    /// Symlink chain is longer than the hop bound.
    #[error(
        "too many levels of symbolic links from {:?} (limit {})",
        source_path.display(),
        max_hops
    )]
    TooManyLevels {
        source_path: PathBuf,
        max_hops: usize,
    },

    /// Entry at the link path exists but is not a symlink.
    #[error("{:?} exists and is not a symlink, refusing to replace it", link_path.display())]
    NotASymlink { link_path: PathBuf },

    /// Underlying filesystem operation failed.
    #[error("filesystem operation failed on {:?}", path.display())]
    Filesystem {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;
    use std::{
        env::current_dir,
        os::unix::fs::MetadataExt,
        sync::{Arc, Mutex},
    };

    #[derive(Debug, Default)]
    struct Capture(Mutex<Vec<String>>);

    impl StatusSink for Arc<Capture> {
        fn status(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_owned());
        }
    }

    #[test_case(Outcome::Created, 0; "created")]
    #[test_case(Outcome::Updated, 0; "updated")]
    #[test_case(Outcome::Skipped, 2; "skipped")]
    #[test]
    fn outcome_exit_codes(outcome: Outcome, expect: i32) {
        pretty_assertions::assert_eq!(outcome.exit_code(), expect);
    }

    #[sealed_test]
    fn create_fresh_link_with_parents() -> anyhow::Result<()> {
        let root = current_dir()?;
        fs::write("a.txt", "data")?;

        let request = LinkRequest::new(root.join("a.txt"), root.join("y/z/link"));
        let outcome = Linker::default().reconcile(&request)?;

        assert_eq!(outcome, Outcome::Created);
        assert!(root.join("y/z").is_dir());
        assert_eq!(fs::read_link(root.join("y/z/link"))?, root.join("a.txt"));
        Ok(())
    }

    #[sealed_test]
    fn reconcile_is_idempotent() -> anyhow::Result<()> {
        fs::write("a.txt", "")?;
        let linker = Linker::default();
        let request = LinkRequest::new("a.txt", "link");

        assert_eq!(linker.reconcile(&request)?, Outcome::Created);
        assert_eq!(linker.reconcile(&request)?, Outcome::Skipped);

        // Relative targets are stored exactly as written.
        assert_eq!(fs::read_link("link")?, PathBuf::from("a.txt"));
        Ok(())
    }

    #[sealed_test]
    fn skip_leaves_link_untouched() -> anyhow::Result<()> {
        fs::write("a.txt", "")?;
        symlink("a.txt", "link")?;
        let inode = fs::symlink_metadata("link")?.ino();

        let outcome = Linker::default().reconcile(&LinkRequest::new("a.txt", "link"))?;

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(fs::symlink_metadata("link")?.ino(), inode);
        Ok(())
    }

    #[sealed_test]
    fn update_replaces_wrong_target() -> anyhow::Result<()> {
        fs::write("old.txt", "")?;
        fs::write("new.txt", "")?;
        symlink("old.txt", "link")?;

        let outcome = Linker::default().reconcile(&LinkRequest::new("new.txt", "link"))?;

        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(fs::read_link("link")?, PathBuf::from("new.txt"));
        Ok(())
    }

    #[sealed_test]
    fn refuse_to_replace_regular_file() -> anyhow::Result<()> {
        fs::write("a.txt", "")?;
        fs::write("precious", "do not touch")?;

        let error = Linker::default()
            .reconcile(&LinkRequest::new("a.txt", "precious"))
            .unwrap_err();

        assert!(matches!(error, LinkError::NotASymlink { .. }));
        assert_eq!(fs::read_to_string("precious")?, "do not touch");
        Ok(())
    }

    #[sealed_test]
    fn refuse_to_replace_directory() -> anyhow::Result<()> {
        fs::write("a.txt", "")?;
        fs::create_dir("keep")?;
        fs::write("keep/important_file", "contents")?;

        let error = Linker::default()
            .reconcile(&LinkRequest::new("a.txt", "keep"))
            .unwrap_err();

        assert!(matches!(error, LinkError::NotASymlink { .. }));
        assert_eq!(fs::read_to_string("keep/important_file")?, "contents");
        Ok(())
    }

    #[sealed_test]
    fn missing_source_creates_nothing() -> anyhow::Result<()> {
        let error = Linker::default()
            .reconcile(&LinkRequest::new("nope.txt", "link"))
            .unwrap_err();

        assert!(matches!(error, LinkError::SourceNotFound { .. }));
        assert!(fs::symlink_metadata("link").is_err());
        Ok(())
    }

    #[sealed_test]
    fn dangling_source_creates_nothing() -> anyhow::Result<()> {
        symlink("nope.txt", "dangling")?;

        let error = Linker::default()
            .reconcile(&LinkRequest::new("dangling", "link"))
            .unwrap_err();

        assert!(matches!(error, LinkError::SourceNotFound { .. }));
        assert!(fs::symlink_metadata("link").is_err());
        Ok(())
    }

    #[sealed_test]
    fn self_reference_is_circular() -> anyhow::Result<()> {
        let error = Linker::default()
            .reconcile(&LinkRequest::new("link", "link"))
            .unwrap_err();

        assert!(matches!(error, LinkError::CircularReference { .. }));
        assert!(fs::symlink_metadata("link").is_err());
        Ok(())
    }

    #[sealed_test]
    fn two_hop_cycle_is_rejected() -> anyhow::Result<()> {
        symlink("b", "a")?;

        let error = Linker::default()
            .reconcile(&LinkRequest::new("a", "b"))
            .unwrap_err();

        assert!(matches!(error, LinkError::CircularReference { .. }));
        assert!(fs::symlink_metadata("b").is_err());
        assert_eq!(fs::read_link("a")?, PathBuf::from("b"));
        Ok(())
    }

    #[sealed_test]
    fn three_hop_cycle_is_rejected() -> anyhow::Result<()> {
        symlink("b", "a")?;
        symlink("c", "b")?;

        let error = Linker::default()
            .reconcile(&LinkRequest::new("a", "c"))
            .unwrap_err();

        assert!(matches!(error, LinkError::CircularReference { .. }));
        assert!(fs::symlink_metadata("c").is_err());
        Ok(())
    }

    #[sealed_test]
    fn chain_deeper_than_hop_bound_is_rejected() -> anyhow::Result<()> {
        fs::write("base.txt", "")?;
        symlink("base.txt", "hop0")?;
        for hop in 1..50 {
            symlink(format!("hop{}", hop - 1), format!("hop{hop}"))?;
        }

        let error = Linker::default()
            .reconcile(&LinkRequest::new("hop49", "link"))
            .unwrap_err();

        assert!(matches!(error, LinkError::TooManyLevels { .. }));
        assert!(fs::symlink_metadata("link").is_err());
        Ok(())
    }

    #[sealed_test]
    fn source_may_be_a_short_chain() -> anyhow::Result<()> {
        fs::write("base.txt", "")?;
        symlink("base.txt", "mid")?;
        symlink("mid", "top")?;

        let outcome = Linker::default().reconcile(&LinkRequest::new("top", "link"))?;

        assert_eq!(outcome, Outcome::Created);
        assert_eq!(fs::read_link("link")?, PathBuf::from("top"));
        Ok(())
    }

    #[sealed_test]
    fn verbose_emits_bracketed_tags() -> anyhow::Result<()> {
        fs::write("a.txt", "")?;
        fs::write("b.txt", "")?;
        let sink = Arc::new(Capture::default());
        let linker = Linker::with_sink(true, Arc::clone(&sink));

        linker.reconcile(&LinkRequest::new("a.txt", "link"))?;
        linker.reconcile(&LinkRequest::new("a.txt", "link"))?;
        linker.reconcile(&LinkRequest::new("b.txt", "link"))?;
        let _ = linker.reconcile(&LinkRequest::new("a.txt", "a.txt"));

        let lines = sink.0.lock().unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("[OK]"));
        assert!(lines[1].starts_with("[SKIP]"));
        assert!(lines[2].starts_with("[UPDATE]"));
        assert!(lines[3].starts_with("[ERROR]"));
        Ok(())
    }

    #[sealed_test]
    fn quiet_mode_emits_nothing() -> anyhow::Result<()> {
        fs::write("a.txt", "")?;
        let sink = Arc::new(Capture::default());
        let linker = Linker::with_sink(false, Arc::clone(&sink));

        linker.reconcile(&LinkRequest::new("a.txt", "link"))?;

        assert!(sink.0.lock().unwrap().is_empty());
        Ok(())
    }
}
