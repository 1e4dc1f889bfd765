//! Domain types for the kak-ghci bridge.
//!
//! These types define the vocabulary shared by the REPL layer and the
//! command engine: diagnostics with buffer positions, GHCi location
//! ranges, and Kakoune selection descriptors. This crate is I/O-free.

pub mod diagnostic;
pub mod location;

pub use diagnostic::{Diagnostic, Position, Severity};
pub use location::{LocationRange, ParseSelectionError, Selection};
