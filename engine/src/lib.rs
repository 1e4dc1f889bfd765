//! Command engine for the kak-ghci bridge.
//!
//! The engine interacts with the editor through two channels: a FIFO
//! it reads colon-encoded command records from ([`transport`]), and
//! `kak -p` pipes it writes script directives to ([`control`]).
//! [`Router`] maps each record to a handler that queries the GHCi
//! session, updates the [`DiagnosticIndex`], and builds directives via
//! the [`kak`] codegen layer.

pub mod command;
pub mod control;
pub mod index;
pub mod kak;
pub mod router;
pub mod transport;

pub use command::{COMMAND_SPECS, Command, CommandRecord, DispatchError, decode_record};
pub use index::{DiagnosticIndex, Direction, navigate};
pub use router::Router;
