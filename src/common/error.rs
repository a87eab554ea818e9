//! Error types for filedata

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The structural rule a chunk group broke.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceFault {
    #[error("starting chunk number is {found}, not 0")]
    NonZeroStart { found: u32 },

    #[error("chunk size changed from {expected} to {found}")]
    ChunkSizeChanged { expected: u32, found: u32 },

    #[error("missing chunks between {current} and {found}")]
    MissingChunks { current: u32, found: u32 },

    #[error("chunk {found} arrived after chunk {current}")]
    OutOfOrder { current: u32, found: u32 },

    #[error("found chunk {found} after end marker at {end}")]
    ChunkAfterEnd { end: u32, found: u32 },
}

#[derive(Error, Debug)]
pub enum Error {
    // === Decoder Errors ===
    #[error("Source already attached for document {document}; close it first")]
    AlreadyAttached { document: String },

    #[error("Malformed chunk sequence for document {document}: {fault}")]
    MalformedChunkSequence {
        document: String,
        fault: SequenceFault,
    },

    #[error("No end chunk marker for document {document}")]
    IncompleteChunkSequence { document: String },

    // === Codec Errors ===
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Config Errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Does this error describe damaged or truncated stored data, as opposed
    /// to a caller bug or an environment failure?
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Error::MalformedChunkSequence { .. }
                | Error::IncompleteChunkSequence { .. }
                | Error::InvalidKey(_)
        )
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
