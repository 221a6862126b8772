//! Core library for the Jonquil scripting engine and its command-line
//! shell: configuration building, mode dispatch, source loading, syntax
//! diagnostics, snapshot persistence, and deferred-job draining around an
//! embedded ECMAScript-flavored interpreter.

pub mod cli;
pub mod engine;
pub mod error;
pub mod natives;
pub mod repl;
pub mod report;
pub mod shell;
pub mod source;

pub use engine::{
    value::{ErrorValue, Value},
    Engine, Feature, InitFlags, LiteralFormat, SnapshotTarget,
};
pub use error::HostError;
