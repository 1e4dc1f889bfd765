//! Command records and the dispatch table.
//!
//! Every editor-side `ghci-*` command writes one colon-joined line to
//! the FIFO: `name:session:client:timestamp:bufname:buf_line_count`
//! followed by command-specific Kakoune expansions. The table below is
//! the single source of truth for which expansions each command
//! appends; registration ([`crate::kak::register_commands_script`])
//! and validation both read it.

use kak_ghci_repl::SessionError;

/// The commands the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Load,
    Diagnostic,
    Definition,
    Uses,
    TypeAt,
    Info,
    Type,
}

/// One dispatch-table entry: the wire name and the Kakoune expansions
/// the registered editor command appends to each record.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub command: Command,
    pub expansions: &'static [&'static str],
}

pub const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        name: "load",
        command: Command::Load,
        expansions: &[],
    },
    CommandSpec {
        name: "diagnostic",
        command: Command::Diagnostic,
        expansions: &["$kak_cursor_line", "$1", "$2"],
    },
    CommandSpec {
        name: "definition",
        command: Command::Definition,
        expansions: &["$kak_selection_desc"],
    },
    CommandSpec {
        name: "uses",
        command: Command::Uses,
        expansions: &["$kak_selection_desc"],
    },
    CommandSpec {
        name: "typeAt",
        command: Command::TypeAt,
        expansions: &["$kak_selection_desc", "$1"],
    },
    CommandSpec {
        name: "info",
        command: Command::Info,
        expansions: &["$kak_selection", "$1"],
    },
    CommandSpec {
        name: "type",
        command: Command::Type,
        expansions: &["$kak_selection", "$1"],
    },
];

impl Command {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        COMMAND_SPECS
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.command)
    }

    #[must_use]
    pub fn spec(self) -> &'static CommandSpec {
        COMMAND_SPECS
            .iter()
            .find(|spec| spec.command == self)
            .expect("every command has a table entry")
    }
}

/// A decoded FIFO record. Fixed fields first, then the positional
/// extras whose meaning the command's spec defines.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub command: Command,
    pub session: String,
    /// Target client for directives; `None` when the expansion was
    /// empty (no client focused).
    pub client: Option<String>,
    /// Opaque buffer timestamp, echoed back in line-specs flags.
    pub timestamp: String,
    pub bufname: String,
    pub buf_line_count: u32,
    pub extra: Vec<String>,
}

impl CommandRecord {
    /// Positional extra argument, empty string when absent.
    #[must_use]
    pub fn extra(&self, i: usize) -> &str {
        self.extra.get(i).map_or("", String::as_str)
    }
}

/// Everything that can go wrong between reading a FIFO line and
/// piping the resulting directives. All of these are logged at the
/// transport boundary and never terminate the dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("malformed record ({reason}): {line:?}")]
    MalformedRecord { line: String, reason: String },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("display directive failed: {0}")]
    Display(#[from] anyhow::Error),
}

fn malformed(line: &str, reason: impl Into<String>) -> DispatchError {
    DispatchError::MalformedRecord {
        line: line.to_string(),
        reason: reason.into(),
    }
}

/// Decode one FIFO line into a record, validating the field count
/// against the command's expansion schema.
pub fn decode_record(line: &str) -> Result<CommandRecord, DispatchError> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < 6 {
        return Err(malformed(line, "expected at least 6 fields"));
    }

    let command =
        Command::from_name(fields[0]).ok_or_else(|| DispatchError::UnknownCommand(fields[0].to_string()))?;

    let buf_line_count: u32 = fields[5]
        .parse()
        .map_err(|_| malformed(line, "buffer line count is not a number"))?;

    let extra: Vec<String> = fields[6..].iter().map(ToString::to_string).collect();
    let expected = command.spec().expansions.len();
    if extra.len() != expected {
        return Err(malformed(
            line,
            format!("expected {expected} extra fields, got {}", extra.len()),
        ));
    }

    Ok(CommandRecord {
        command,
        session: fields[1].to_string(),
        client: (!fields[2].is_empty()).then(|| fields[2].to_string()),
        timestamp: fields[3].to_string(),
        bufname: fields[4].to_string(),
        buf_line_count,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_load_record() {
        let record = decode_record("load:mysession:client0:42:Main.hs:120").unwrap();
        assert_eq!(record.command, Command::Load);
        assert_eq!(record.session, "mysession");
        assert_eq!(record.client.as_deref(), Some("client0"));
        assert_eq!(record.timestamp, "42");
        assert_eq!(record.bufname, "Main.hs");
        assert_eq!(record.buf_line_count, 120);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_decode_diagnostic_record_with_extras() {
        let record = decode_record("diagnostic:s:c:1:Main.hs:30:17:next:").unwrap();
        assert_eq!(record.command, Command::Diagnostic);
        assert_eq!(record.extra, vec!["17", "next", ""]);
        assert_eq!(record.extra(0), "17");
        assert_eq!(record.extra(2), "");
        // out of range reads as empty, not a panic
        assert_eq!(record.extra(9), "");
    }

    #[test]
    fn test_decode_empty_client_is_none() {
        let record = decode_record("load:s::1:Main.hs:30").unwrap();
        assert!(record.client.is_none());
    }

    #[test]
    fn test_decode_short_record_is_malformed() {
        let err = decode_record("load:s:c:1:Main.hs").unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRecord { .. }));
    }

    #[test]
    fn test_decode_unknown_command() {
        let err = decode_record("frobnicate:s:c:1:Main.hs:30").unwrap_err();
        match err {
            DispatchError::UnknownCommand(name) => assert_eq!(name, "frobnicate"),
            other => panic!("expected UnknownCommand, got {other}"),
        }
    }

    #[test]
    fn test_decode_bad_line_count_is_malformed() {
        let err = decode_record("load:s:c:1:Main.hs:abc").unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRecord { .. }));
    }

    #[test]
    fn test_decode_wrong_extra_count_is_malformed() {
        // load takes no extras
        let err = decode_record("load:s:c:1:Main.hs:30:bogus").unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRecord { .. }));
        // diagnostic takes exactly three
        let err = decode_record("diagnostic:s:c:1:Main.hs:30:17").unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRecord { .. }));
    }

    #[test]
    fn test_every_spec_round_trips_through_from_name() {
        for spec in COMMAND_SPECS {
            assert_eq!(Command::from_name(spec.name), Some(spec.command));
            assert_eq!(spec.command.spec().name, spec.name);
        }
    }
}
