//! Diagnostic index — the bridge's only mutable state.
//!
//! Holds the diagnostics from the most recent `:load`, fully replaced
//! on every load (never merged). One index per bridge process, for the
//! last loaded buffer only.

use std::collections::HashSet;

use kak_ghci_repl::ReplMessage;
use kak_ghci_types::Diagnostic;

/// Direction for cursor-relative navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    /// Parse the optional direction argument of the `diagnostic`
    /// command. Anything other than `next`/`prev` means "stay put".
    #[must_use]
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "next" => Some(Self::Next),
            "prev" => Some(Self::Prev),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticIndex {
    warnings: Vec<Diagnostic>,
}

impl DiagnosticIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored set with a fresh parse: keep the positioned
    /// diagnostics, dedup by structural equality preserving first
    /// occurrence, clamp lines to the buffer length, and sort by
    /// `(filename, line, col)`.
    pub fn replace(&mut self, messages: Vec<ReplMessage>, buf_line_count: u32) {
        let mut seen = HashSet::new();
        let mut warnings: Vec<Diagnostic> = Vec::new();
        for message in messages {
            let ReplMessage::Diagnostic(diag) = message else {
                continue;
            };
            if seen.insert(diag.clone()) {
                warnings.push(diag);
            }
        }

        for diag in &mut warnings {
            diag.clamp_line(buf_line_count);
        }

        warnings.sort_by(|a, b| {
            a.filename()
                .cmp(b.filename())
                .then_with(|| a.line().cmp(&b.line()))
                .then_with(|| a.col().cmp(&b.col()))
        });

        self.warnings = warnings;
    }

    /// The diagnostics for one buffer, in index order.
    #[must_use]
    pub fn for_buffer(&self, bufname: &str) -> Vec<&Diagnostic> {
        self.warnings
            .iter()
            .filter(|d| d.filename() == bufname)
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

/// Find the diagnostic to jump to from `from_line`.
///
/// `next` scans the entries in order and takes the first strictly past
/// the cursor (`line > from_line`). `prev` is the mirror: reverse the
/// sequence, then apply the same strictly-past rule with `<`. If
/// nothing is strictly past the cursor, wrap to the first element of
/// the (possibly reversed) sequence. `None` only when empty.
#[must_use]
pub fn navigate<'a>(
    entries: &[&'a Diagnostic],
    from_line: u32,
    direction: Direction,
) -> Option<&'a Diagnostic> {
    let scan: Vec<&Diagnostic> = match direction {
        Direction::Next => entries.to_vec(),
        Direction::Prev => entries.iter().rev().copied().collect(),
    };
    scan.iter()
        .copied()
        .find(|d| match direction {
            Direction::Next => d.line() > from_line,
            Direction::Prev => d.line() < from_line,
        })
        .or_else(|| scan.first().copied())
}
