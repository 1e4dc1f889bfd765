//! Typed GHCi query surface.
//!
//! Six primitives, each one command line in and one free-text block
//! out, with the matching parser applied. The trait seam exists so the
//! command engine can be driven by a scripted REPL in tests instead of
//! a real GHCi process.

use kak_ghci_types::{LocationRange, Selection};

use crate::parse::{ReplMessage, parse_load_output, parse_location_list, parse_location_range};
use crate::session::{ReplSession, SessionError};

/// The GHCi operations the command engine dispatches against.
#[allow(async_fn_in_trait)]
pub trait GhciOps {
    /// `:load` — (re)compile a file, returning the parsed message
    /// blocks.
    async fn load_file(&mut self, file: &str) -> Result<Vec<ReplMessage>, SessionError>;

    /// `:type-at` — the type of the expression at a span.
    async fn type_at(&mut self, file: &str, sel: Selection) -> Result<String, SessionError>;

    /// `:loc-at` — where the thing at a span is defined.
    async fn loc_at(
        &mut self,
        file: &str,
        sel: Selection,
    ) -> Result<Option<LocationRange>, SessionError>;

    /// `:uses` — every usage site of the thing at a span.
    async fn uses(
        &mut self,
        file: &str,
        sel: Selection,
    ) -> Result<Vec<LocationRange>, SessionError>;

    /// `:info` — documentation for arbitrary text.
    async fn info(&mut self, text: &str) -> Result<String, SessionError>;

    /// `:type` — the type of arbitrary text.
    async fn type_of(&mut self, text: &str) -> Result<String, SessionError>;
}

fn span_args(sel: Selection) -> String {
    format!("{} {} {} {}", sel.line1, sel.col1, sel.line2, sel.col2)
}

impl GhciOps for ReplSession {
    async fn load_file(&mut self, file: &str) -> Result<Vec<ReplMessage>, SessionError> {
        let raw = self.run(&format!(":load {file}")).await?;
        let parsed = parse_load_output(&raw);
        tracing::debug!(file, blocks = parsed.len(), "ghci load parsed");
        Ok(parsed)
    }

    async fn type_at(&mut self, file: &str, sel: Selection) -> Result<String, SessionError> {
        self.run(&format!(":type-at {file} {}", span_args(sel))).await
    }

    async fn loc_at(
        &mut self,
        file: &str,
        sel: Selection,
    ) -> Result<Option<LocationRange>, SessionError> {
        let raw = self.run(&format!(":loc-at {file} {}", span_args(sel))).await?;
        Ok(parse_location_range(raw.trim()))
    }

    async fn uses(
        &mut self,
        file: &str,
        sel: Selection,
    ) -> Result<Vec<LocationRange>, SessionError> {
        let raw = self.run(&format!(":uses {file} {}", span_args(sel))).await?;
        Ok(parse_location_list(&raw))
    }

    async fn info(&mut self, text: &str) -> Result<String, SessionError> {
        self.run(&format!(":info {text}")).await
    }

    async fn type_of(&mut self, text: &str) -> Result<String, SessionError> {
        self.run(&format!(":type {text}")).await
    }
}
