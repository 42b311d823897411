//! offimg core - offline image nodes for rich-text documents
//!
//! This crate contains the host-independent logic:
//! - Text/base64 codec and `data:` URIs
//! - Deterministic SVG placeholders
//! - The content store contract and its validation
//! - Image node schema, parse and render
//! - Document model, selection and the insert command
//! - Markup codec and configuration

pub mod codec;
pub mod command;
pub mod config;
pub mod data_uri;
pub mod diagnostics;
pub mod doc;
pub mod error;
pub mod hash;
pub mod markup;
pub mod node;
pub mod placeholder;
pub mod selection;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use doc::{Document, NodeId, Transaction};
pub use error::{DecodeError, DocumentError, IncompatibleStoreError, InvalidAttributesError, StoreError};
pub use hash::HashAlgorithm;
pub use node::ImageAttrs;
pub use selection::Selection;
pub use store::{ContentStore, StoreHandle};
