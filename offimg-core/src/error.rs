//! Error types shared across the image node subsystem

use thiserror::Error;

use crate::store::Capability;

/// A content store was configured without one of the required operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("incompatible content store: missing `{missing}`")]
pub struct IncompatibleStoreError {
    pub missing: Capability,
}

/// Malformed base64, text or data URI payloads
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid {encoding}")]
    Text { encoding: &'static str },

    #[error("malformed data URI: {0}")]
    DataUri(String),

    #[error("content hash mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("content is not a recognised image format")]
    UnsupportedContent,
}

/// Failures reported by a content store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store does not support `{0}`")]
    Unsupported(Capability),

    #[error("invalid store key: {0:?}")]
    InvalidKey(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),
}

/// Attribute sets rejected before they reach the document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAttributesError {
    #[error("src must not be empty")]
    EmptySrc,

    #[error("src is not a renderable image URI: {0}")]
    UnrenderableSrc(String),

    #[error("content hash {hash:?} is not a valid {algorithm} digest")]
    InvalidHash { hash: String, algorithm: &'static str },
}

/// Rejected document mutations. The document is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("position {pos} is outside the document (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("invalid image attributes: {0}")]
    InvalidAttributes(#[from] InvalidAttributesError),
}
