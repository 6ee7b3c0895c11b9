//! Error types for batch conversion.

use std::io;
use std::path::PathBuf;

use mdb_codec::CodecError;
use thiserror::Error;

/// Result alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from converting one input, or from preparing a batch output.
#[derive(Debug, Error)]
pub enum Error {
    /// The file contents could not be decoded or encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A file could not be opened, created or moved into place.
    #[error("unable to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
