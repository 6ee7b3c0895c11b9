//! Error types for mdb, OBJ and collision description coding.

use std::io;

use thiserror::Error;

/// Result alias used throughout the codec.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding or encoding a single file.
///
/// Every variant aborts the file being processed; batch drivers are expected
/// to log it and move on to the next input.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The byte stream ended early or a seek failed.
    #[error("unable to read {context}")]
    Read {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The output stream rejected a write or seek.
    #[error("unable to write {context}")]
    Write {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The data is structurally impossible to represent.
    #[error("invalid {context}: {detail}")]
    InvalidFormat { context: &'static str, detail: String },

    /// A 16-bit index space overflowed.
    #[error("{what} count can't exceed {limit}")]
    CapacityExceeded { what: &'static str, limit: usize },

    /// A record points at something that does not exist.
    #[error("{context}: index {index} out of range")]
    MissingReference { context: String, index: i64 },
}

/// Attach a stage description to an I/O result.
pub(crate) trait IoContext<T> {
    fn reading(self, context: impl FnOnce() -> String) -> CodecResult<T>;
    fn writing(self, context: impl FnOnce() -> String) -> CodecResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn reading(self, context: impl FnOnce() -> String) -> CodecResult<T> {
        self.map_err(|source| CodecError::Read {
            context: context(),
            source,
        })
    }

    fn writing(self, context: impl FnOnce() -> String) -> CodecResult<T> {
        self.map_err(|source| CodecError::Write {
            context: context(),
            source,
        })
    }
}
