//! Kakoune script generation.
//!
//! Everything the bridge sends back to the editor is built here, as a
//! small codegen layer with explicit escaping. Any unescaped quote in
//! an outbound directive corrupts the script, so [`single_quoted`] is
//! the only way strings enter one.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use kak_ghci_types::{Diagnostic, Selection};

use crate::command::COMMAND_SPECS;

/// Lines shown in an `info` box before truncation.
const INFO_MAX_LINES: usize = 20;

/// Kakoune-style single-quote escaping: `\` doubles, `'` gains a
/// backslash.
#[must_use]
pub fn single_quote_escape(s: &str) -> String {
    s.replace('\\', r"\\").replace('\'', r"\'")
}

/// The string wrapped in single quotes, escaped Kakoune-style.
#[must_use]
pub fn single_quoted(s: &str) -> String {
    format!("'{}'", single_quote_escape(s))
}

#[must_use]
pub fn edit(filename: &str) -> String {
    format!("edit {filename}")
}

/// A `select` directive over one or more spans (all in one buffer).
#[must_use]
pub fn select(spans: &[Selection]) -> String {
    let descs: Vec<String> = spans
        .iter()
        .map(|s| format!("{}.{},{}.{}", s.line1, s.col1, s.line2, s.col2))
        .collect();
    format!("select {}", descs.join(":"))
}

/// The gutter directive for a buffer: declare the `ghci_flags`
/// line-specs option if needed, set one color-coded flag per
/// diagnostic line, and enable the flag-lines highlighter.
#[must_use]
pub fn gutter_flags_directive(
    bufname: &str,
    timestamp: &str,
    diagnostics: &[&Diagnostic],
) -> String {
    let mut flags: Vec<String> = vec![timestamp.to_string(), "1|  ".to_string()];
    flags.extend(
        diagnostics
            .iter()
            .map(|d| format!("{}|{{{}}}\u{2022} ", d.line(), d.severity().gutter_color())),
    );
    let value = single_quoted(&flags.join(":"));

    [
        "try %{decl line-specs ghci_flags}".to_string(),
        format!("set buffer={bufname} ghci_flags {value}"),
        "try %{addhl window/ flag_lines default ghci_flags}".to_string(),
    ]
    .join("\n")
}

/// Where a message should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTarget {
    /// Status line, first line of the message only.
    Echo,
    /// Floating info box, optionally anchored above a position.
    Info { anchor: Option<(u32, u32)> },
    /// Scratch buffer in the docs client, full message, reflowed.
    Docs,
}

impl DisplayTarget {
    /// Resolve the effective target: an explicit argument wins, then
    /// an anchor computed during diagnostic collection, then the
    /// status line.
    #[must_use]
    pub fn resolve(arg: &str, anchor: Option<(u32, u32)>) -> Self {
        match arg {
            "docsclient" => Self::Docs,
            s if s.starts_with("info") => Self::Info { anchor: None },
            "" => anchor.map_or(Self::Echo, |a| Self::Info { anchor: Some(a) }),
            _ => Self::Echo,
        }
    }
}

/// Build the display directive for a message. Empty messages produce
/// an empty directive, which the control channel drops.
pub fn echo(msg: &str, target: DisplayTarget) -> Result<String> {
    let msg = msg.trim_end();
    if msg.is_empty() {
        return Ok(String::new());
    }

    match target {
        DisplayTarget::Echo => Ok(format!(
            "echo {}",
            single_quoted(msg.lines().next().unwrap_or(""))
        )),
        DisplayTarget::Info { anchor } => {
            let shown: Vec<&str> = msg.lines().take(INFO_MAX_LINES).collect();
            let quoted = single_quoted(&shown.join("\n"));
            Ok(match anchor {
                Some((line, col)) => {
                    format!("info -placement above -anchor {line}.{col} {quoted}")
                }
                None => format!("info {quoted}"),
            })
        }
        DisplayTarget::Docs => {
            let mut file =
                tempfile::NamedTempFile::new().context("creating docs payload file")?;
            file.write_all(msg.as_bytes())
                .context("writing docs payload")?;
            let path = file
                .into_temp_path()
                .keep()
                .context("persisting docs payload file")?;
            Ok(docs_directive(&path))
        }
    }
}

/// Render a payload file in the docs client: paste it into a scratch
/// buffer, reflow to the window width, and delete the file.
fn docs_directive(payload: &Path) -> String {
    format!(
        "eval -no-hooks -try-client %opt[docsclient] %[
  edit! -scratch '*doc*'
  exec \\%d|cat<space> {path}<ret>
  exec \\%|fmt<space> - %val[window_width] <space> -s <ret>
  exec gg
  set buffer filetype rst
  try %[rmhl number_lines]
  %sh[rm {path}]
]",
        path = payload.display()
    )
}

/// One `def` per dispatch-table entry: the editor command encodes its
/// record and writes it to the FIFO.
#[must_use]
pub fn register_commands_script(fifo: &Path) -> String {
    COMMAND_SPECS
        .iter()
        .map(|spec| {
            let extras: String = spec
                .expansions
                .iter()
                .map(|e| format!(":{e}"))
                .collect();
            format!(
                "def -allow-override -params .. ghci-{name} \
                 %(%sh(echo {name}:$kak_session:$kak_client:$kak_timestamp:$kak_bufname:$kak_buf_line_count{extras} > {fifo}))",
                name = spec.name,
                fifo = fifo.display(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Buffer-local key bindings plus the hook that installs them on
/// Haskell buffers.
#[must_use]
pub fn bindings_script() -> &'static str {
    "def -allow-override ghci-bindings-for-buffer %{
    map buffer user . ': ghci-definition<ret>'
    map buffer user u ': ghci-uses<ret>'
    map buffer user t ': ghci-diagnostic next<ret>'
    map buffer user n ': ghci-diagnostic prev<ret>'
    map buffer user e ': ghci-diagnostic<ret>'
    map buffer user i ': ghci-typeAt info<ret>'
    map buffer user h ': ghci-info info<ret>'
}
def -allow-override ghci-hook-bindings-for-buffer %{
    hook -group ghci global BufSetOption filetype=haskell ghci-bindings-for-buffer
}"
}
