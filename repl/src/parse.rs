//! Pure parsers for GHCi textual output.
//!
//! GHCi's output format is not contractually stable across versions,
//! so every parser here is permissive: anything that doesn't match the
//! expected shape degrades to a bare message (or is discarded, for
//! location lists) instead of failing.

use std::sync::OnceLock;

use kak_ghci_types::{Diagnostic, LocationRange, Position};
use regex::Regex;

/// One block of `:load` output: either a position-tagged diagnostic or
/// a bare status message (`[1 of 3] Compiling ...`, `Ok, modules
/// loaded.` and friends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplMessage {
    Diagnostic(Diagnostic),
    Bare(String),
}

fn diagnostic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(?P<filename>[^:\n]+):(?P<line>\d+):(?P<col>\d+): (?P<msg>.*)$")
            .expect("diagnostic pattern is valid")
    })
}

fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<filename>[^:\n]+):\((?P<line1>\d+),(?P<col1>\d+)\)-\((?P<line2>\d+),(?P<col2>\d+)\)",
        )
        .expect("location pattern is valid")
    })
}

/// Split `:load` output into blocks and parse each.
///
/// A new block starts at every line beginning with a non-whitespace
/// character; indented lines are message continuations and stay
/// attached to their block. Blank lines never start a block either.
pub fn parse_load_output(text: &str) -> Vec<ReplMessage> {
    chunks(text)
        .iter()
        .map(|chunk| parse_message(chunk.trim_end()))
        .collect()
}

/// Parse one `:loc-at` result line. Returns `None` for non-location
/// output such as `not in scope`.
pub fn parse_location_range(text: &str) -> Option<LocationRange> {
    let caps = location_re().captures(text)?;
    Some(LocationRange {
        filename: caps["filename"].to_string(),
        line1: caps["line1"].parse().ok()?,
        col1: caps["col1"].parse().ok()?,
        line2: caps["line2"].parse().ok()?,
        col2: caps["col2"].parse().ok()?,
    })
}

/// Parse `:uses` output linewise, discarding lines that aren't
/// location ranges.
pub fn parse_location_list(text: &str) -> Vec<LocationRange> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_location_range)
        .collect()
}

fn chunks(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let starts_block = line.chars().next().is_some_and(|c| !c.is_whitespace());
        match out.last_mut() {
            Some(chunk) if !starts_block => {
                chunk.push('\n');
                chunk.push_str(line);
            }
            _ => out.push(line.to_string()),
        }
    }
    out
}

fn parse_message(chunk: &str) -> ReplMessage {
    let Some(caps) = diagnostic_re().captures(chunk) else {
        return ReplMessage::Bare(chunk.to_string());
    };
    let (Ok(line), Ok(col)) = (caps["line"].parse(), caps["col"].parse()) else {
        return ReplMessage::Bare(chunk.to_string());
    };
    ReplMessage::Diagnostic(Diagnostic::new(
        Position::new(caps["filename"].to_string(), line, col),
        caps["msg"].to_string(),
    ))
}
