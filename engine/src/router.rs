//! Command dispatch.
//!
//! Every command starts with a reload of the current buffer so GHCi's
//! picture of the module and the gutter flags are never stale; the
//! command-specific directives follow. Each returned string is one
//! message for the editor control channel.

use kak_ghci_repl::GhciOps;
use kak_ghci_types::{Diagnostic, Selection};

use crate::command::{Command, CommandRecord, DispatchError};
use crate::index::{DiagnosticIndex, Direction, navigate};
use crate::kak::{self, DisplayTarget};

#[derive(Debug, Default)]
pub struct Router {
    index: DiagnosticIndex,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: DiagnosticIndex::new(),
        }
    }

    /// Handle one decoded record against the REPL, returning the
    /// directives to pipe back to the editor in order.
    pub async fn dispatch<G: GhciOps>(
        &mut self,
        ghci: &mut G,
        record: &CommandRecord,
    ) -> Result<Vec<String>, DispatchError> {
        let mut directives = vec![self.reload(ghci, record).await?];
        match record.command {
            Command::Load => {}
            Command::Diagnostic => self.diagnostic(record, &mut directives)?,
            Command::Definition => {
                Self::definition(ghci, record, &mut directives).await?;
            }
            Command::Uses => Self::uses(ghci, record, &mut directives).await?,
            Command::TypeAt => {
                let sel = parse_selection(record)?;
                let text = ghci.type_at(&record.bufname, sel).await?;
                push_echo(&mut directives, &text, record.extra(1), None)?;
            }
            Command::Info => {
                let text = ghci.info(record.extra(0)).await?;
                push_echo(&mut directives, &text, record.extra(1), None)?;
            }
            Command::Type => {
                let text = ghci.type_of(record.extra(0)).await?;
                push_echo(&mut directives, &text, record.extra(1), None)?;
            }
        }
        Ok(directives)
    }

    /// Reload the buffer's module, rebuild the diagnostic index, and
    /// return the fresh gutter directive.
    async fn reload<G: GhciOps>(
        &mut self,
        ghci: &mut G,
        record: &CommandRecord,
    ) -> Result<String, DispatchError> {
        let messages = ghci.load_file(&record.bufname).await?;
        self.index.replace(messages, record.buf_line_count);
        Ok(kak::gutter_flags_directive(
            &record.bufname,
            &record.timestamp,
            &self.index.for_buffer(&record.bufname),
        ))
    }

    /// Jump to the next/prev diagnostic (or stay put when no direction
    /// was given) and display the messages on the landing line.
    fn diagnostic(
        &self,
        record: &CommandRecord,
        directives: &mut Vec<String>,
    ) -> Result<(), DispatchError> {
        let cursor_line: u32 = record.extra(0).parse().map_err(|_| {
            DispatchError::MalformedRecord {
                line: record.extra(0).to_string(),
                reason: "cursor line is not a number".to_string(),
            }
        })?;

        let entries = self.index.for_buffer(&record.bufname);
        let mut line = cursor_line;
        if let Some(direction) = Direction::from_arg(record.extra(1)) {
            if let Some(dest) = navigate(&entries, cursor_line, direction) {
                if dest.line() != cursor_line {
                    directives.push(kak::select(&[cursor_selection(dest)]));
                }
                line = dest.line();
            }
        }

        let on_line: Vec<&&Diagnostic> =
            entries.iter().filter(|d| d.line() == line).collect();
        let anchor = on_line.first().map(|d| (d.line(), d.col()));
        let combined = on_line
            .iter()
            .map(|d| d.message())
            .collect::<Vec<_>>()
            .join("\n\n");
        push_echo(directives, &combined, record.extra(2), anchor)
    }

    async fn definition<G: GhciOps>(
        ghci: &mut G,
        record: &CommandRecord,
        directives: &mut Vec<String>,
    ) -> Result<(), DispatchError> {
        let sel = parse_selection(record)?;
        match ghci.loc_at(&record.bufname, sel).await? {
            Some(range) => directives.push(format!(
                "{};{}",
                kak::edit(&range.filename),
                kak::select(&[Selection::from(&range)])
            )),
            None => tracing::debug!(bufname = %record.bufname, "loc-at gave no location"),
        }
        Ok(())
    }

    /// Jump to the usage sites in the most relevant single file.
    /// Preference order when usages span files: the definition site
    /// (the first reported location), then the current buffer, then
    /// any other file.
    async fn uses<G: GhciOps>(
        ghci: &mut G,
        record: &CommandRecord,
        directives: &mut Vec<String>,
    ) -> Result<(), DispatchError> {
        let sel = parse_selection(record)?;
        let ranges = ghci.uses(&record.bufname, sel).await?;
        let Some(first) = ranges.first() else {
            tracing::debug!(bufname = %record.bufname, "uses gave no locations");
            return Ok(());
        };

        let definition_file = first.filename.clone();
        let mut filenames: Vec<&str> = ranges.iter().map(|r| r.filename.as_str()).collect();
        filenames.sort_by_key(|name| (*name == definition_file, *name == record.bufname));
        let best = filenames.last().copied().unwrap_or(&definition_file);

        let spans: Vec<Selection> = ranges
            .iter()
            .filter(|r| r.filename == best)
            .map(Selection::from)
            .collect();
        directives.push(format!("{};{}", kak::edit(best), kak::select(&spans)));
        Ok(())
    }
}

fn parse_selection(record: &CommandRecord) -> Result<Selection, DispatchError> {
    record
        .extra(0)
        .parse()
        .map_err(|e: kak_ghci_types::ParseSelectionError| DispatchError::MalformedRecord {
            line: record.extra(0).to_string(),
            reason: e.to_string(),
        })
}

fn cursor_selection(d: &Diagnostic) -> Selection {
    Selection {
        line1: d.line(),
        col1: d.col(),
        line2: d.line(),
        col2: d.col(),
    }
}

fn push_echo(
    directives: &mut Vec<String>,
    msg: &str,
    where_arg: &str,
    anchor: Option<(u32, u32)>,
) -> Result<(), DispatchError> {
    let directive = kak::echo(msg, DisplayTarget::resolve(where_arg, anchor))?;
    if !directive.is_empty() {
        directives.push(directive);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::decode_record;
    use kak_ghci_repl::{ReplMessage, SessionError};
    use kak_ghci_types::{LocationRange, Position};

    /// Scripted REPL: serves canned responses instead of spawning a
    /// process.
    #[derive(Default)]
    struct FakeGhci {
        load_messages: Vec<ReplMessage>,
        loc: Option<LocationRange>,
        uses: Vec<LocationRange>,
        text: String,
    }

    impl GhciOps for FakeGhci {
        async fn load_file(&mut self, _file: &str) -> Result<Vec<ReplMessage>, SessionError> {
            Ok(self.load_messages.clone())
        }

        async fn type_at(&mut self, _file: &str, _sel: Selection) -> Result<String, SessionError> {
            Ok(self.text.clone())
        }

        async fn loc_at(
            &mut self,
            _file: &str,
            _sel: Selection,
        ) -> Result<Option<LocationRange>, SessionError> {
            Ok(self.loc.clone())
        }

        async fn uses(
            &mut self,
            _file: &str,
            _sel: Selection,
        ) -> Result<Vec<LocationRange>, SessionError> {
            Ok(self.uses.clone())
        }

        async fn info(&mut self, _text: &str) -> Result<String, SessionError> {
            Ok(self.text.clone())
        }

        async fn type_of(&mut self, _text: &str) -> Result<String, SessionError> {
            Ok(self.text.clone())
        }
    }

    fn message(file: &str, line: u32, col: u32, msg: &str) -> ReplMessage {
        ReplMessage::Diagnostic(Diagnostic::new(
            Position::new(file.to_string(), line, col),
            msg.to_string(),
        ))
    }

    fn range(file: &str, l1: u32, c1: u32, l2: u32, c2: u32) -> LocationRange {
        LocationRange {
            filename: file.to_string(),
            line1: l1,
            col1: c1,
            line2: l2,
            col2: c2,
        }
    }

    async fn run(ghci: &mut FakeGhci, line: &str) -> Vec<String> {
        let record = decode_record(line).unwrap();
        Router::new().dispatch(ghci, &record).await.unwrap()
    }

    #[tokio::test]
    async fn test_load_reports_gutter_flags() {
        let mut ghci = FakeGhci {
            load_messages: vec![
                message("Main.hs", 5, 1, "warning: unused import"),
                message("Main.hs", 10, 3, "error: not in scope"),
                message("Other.hs", 2, 1, "warning: elsewhere"),
            ],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "load:s:c:42:Main.hs:120").await;
        assert_eq!(out.len(), 1);
        // only Main.hs entries flag, severity picks the color
        assert!(out[0].contains("5|{yellow}\u{2022} :10|{red}\u{2022} "));
        assert!(!out[0].contains("2|"));
        assert!(out[0].contains("set buffer=Main.hs ghci_flags "));
    }

    #[tokio::test]
    async fn test_diagnostic_next_jumps_and_shows_message() {
        let mut ghci = FakeGhci {
            load_messages: vec![message("Main.hs", 5, 7, "warning: unused import")],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "diagnostic:s:c:42:Main.hs:120:1:next:").await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], "select 5.7,5.7");
        assert_eq!(
            out[2],
            "info -placement above -anchor 5.7 'warning: unused import'"
        );
    }

    #[tokio::test]
    async fn test_diagnostic_without_direction_stays_on_cursor_line() {
        let mut ghci = FakeGhci {
            load_messages: vec![
                message("Main.hs", 5, 7, "warning: unused import"),
                message("Main.hs", 9, 1, "error: not in scope"),
            ],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "diagnostic:s:c:42:Main.hs:120:9::").await;
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[1],
            "info -placement above -anchor 9.1 'error: not in scope'"
        );
    }

    #[tokio::test]
    async fn test_diagnostic_quiet_line_reports_nothing() {
        let mut ghci = FakeGhci::default();
        let out = run(&mut ghci, "diagnostic:s:c:42:Main.hs:120:9::").await;
        // just the gutter reset
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn test_diagnostic_explicit_target_overrides_anchor() {
        let mut ghci = FakeGhci {
            load_messages: vec![message("Main.hs", 5, 7, "warning: shadowing")],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "diagnostic:s:c:42:Main.hs:120:5::info").await;
        assert_eq!(out[1], "info 'warning: shadowing'");
    }

    #[tokio::test]
    async fn test_diagnostic_joins_colocated_messages() {
        let mut ghci = FakeGhci {
            load_messages: vec![
                message("Main.hs", 5, 7, "warning: first"),
                message("Main.hs", 5, 12, "warning: second"),
            ],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "diagnostic:s:c:42:Main.hs:120:5::").await;
        assert_eq!(
            out[1],
            "info -placement above -anchor 5.7 'warning: first\n\nwarning: second'"
        );
    }

    #[tokio::test]
    async fn test_diagnostic_rejects_bad_cursor_line() {
        let mut ghci = FakeGhci::default();
        let record = decode_record("diagnostic:s:c:42:Main.hs:120:garbage:next:").unwrap();
        let err = Router::new().dispatch(&mut ghci, &record).await.unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_definition_edits_and_selects() {
        let mut ghci = FakeGhci {
            loc: Some(range("Lib.hs", 3, 1, 3, 8)),
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "definition:s:c:42:Main.hs:120:7.2,7.5").await;
        assert_eq!(out[1], "edit Lib.hs;select 3.1,3.8");
    }

    #[tokio::test]
    async fn test_definition_without_location_only_reloads() {
        let mut ghci = FakeGhci::default();
        let out = run(&mut ghci, "definition:s:c:42:Main.hs:120:7.2,7.5").await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn test_uses_prefers_definition_file_across_files() {
        let mut ghci = FakeGhci {
            uses: vec![
                range("Def.hs", 1, 1, 1, 4),
                range("Main.hs", 5, 2, 5, 5),
                range("Other.hs", 9, 1, 9, 4),
                range("Other.hs", 12, 1, 12, 4),
            ],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "uses:s:c:42:Main.hs:120:7.2,7.5").await;
        // the definition site (first reported location) outranks both
        // the current buffer and the unrelated file
        assert_eq!(out[1], "edit Def.hs;select 1.1,1.4");
    }

    #[tokio::test]
    async fn test_uses_all_in_definition_file_stays_there() {
        let mut ghci = FakeGhci {
            uses: vec![range("Def.hs", 1, 1, 1, 4), range("Def.hs", 8, 2, 8, 5)],
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "uses:s:c:42:Main.hs:120:7.2,7.5").await;
        assert_eq!(out[1], "edit Def.hs;select 1.1,1.4:8.2,8.5");
    }

    #[tokio::test]
    async fn test_uses_empty_only_reloads() {
        let mut ghci = FakeGhci::default();
        let out = run(&mut ghci, "uses:s:c:42:Main.hs:120:7.2,7.5").await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn test_type_at_echoes_result() {
        let mut ghci = FakeGhci {
            text: "f :: Int -> Int".to_string(),
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "typeAt:s:c:42:Main.hs:120:7.2,7.5:").await;
        assert_eq!(out[1], "echo 'f :: Int -> Int'");
    }

    #[tokio::test]
    async fn test_info_goes_to_info_box_when_asked() {
        let mut ghci = FakeGhci {
            text: "data Maybe a = Nothing | Just a".to_string(),
            ..FakeGhci::default()
        };
        let out = run(&mut ghci, "info:s:c:42:Main.hs:120:Maybe:info").await;
        assert_eq!(out[1], "info 'data Maybe a = Nothing | Just a'");
    }

    #[tokio::test]
    async fn test_empty_reply_produces_no_echo() {
        let mut ghci = FakeGhci::default();
        let out = run(&mut ghci, "type:s:c:42:Main.hs:120:x:").await;
        assert_eq!(out.len(), 1);
    }
}
