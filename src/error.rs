use std::io;

use thiserror::Error;

use crate::engine::value::ErrorValue;

/// Everything that can go wrong while the shell drives the engine. Usage
/// problems are rejected earlier, before the engine exists, and have their
/// own type in `cli`.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to open file: {path}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read file: {path}")]
    Read { path: String },
    #[error("file exceeds the source buffer capacity: {path}")]
    TooLarge { path: String },
    #[error("input must be a valid UTF-8 string: {path}")]
    Encoding { path: String },
    #[error("{0}")]
    Script(ErrorValue),
    #[error("snapshot saving failed")]
    SnapshotSave,
    #[error("literal saving failed")]
    LiteralSave,
    #[error("failed to write file: {path}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}
