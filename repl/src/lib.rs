//! GHCi session layer for the kak-ghci bridge.
//!
//! [`ReplSession`] owns the GHCi child process and speaks its
//! line-in / prompt-delimited-block-out protocol. [`parse`] turns the
//! raw blocks into structured diagnostics and location ranges.
//! [`GhciOps`] is the typed query surface the command engine consumes.

pub mod ghci;
pub mod parse;
pub mod session;

pub use ghci::GhciOps;
pub use parse::{ReplMessage, parse_load_output, parse_location_list, parse_location_range};
pub use session::{ReplSession, SessionError};
