// SPDX-FileCopyrightText: 2026 MyLiCuLa Contributors
// SPDX-License-Identifier: MIT

//! Status reporting for link reconciliation.
//!
//! Verbose reconciliation emits one human-readable line per outcome. The
//! line starts with a bracketed tag (`[OK]`, `[SKIP]`, `[UPDATE]`,
//! `[ERROR]`); the rest of the wording is free-form. Where those lines end
//! up is left behind a small sink trait so callers can capture or redirect
//! them.

/// Destination for status lines.
pub trait StatusSink: Send + Sync + 'static {
    /// Deliver one complete status line.
    fn status(&self, line: &str);
}

/// Print status lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn status(&self, line: &str) {
        println!("{line}");
    }
}
