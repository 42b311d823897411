//! Host runtime error types

use offimg_core::{DecodeError, StoreError};
use thiserror::Error;

/// Why a stored record could not be turned into a displayable image
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("store read failed: {0}")]
    Store(#[from] StoreError),
}

/// Why a dropped file could not be read
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} is {size} bytes, larger than the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("{name} is empty")]
    Empty { name: String },

    #[error("{name} is not a recognised image (declared `{mime}`)")]
    NotAnImage { name: String, mime: String },
}
