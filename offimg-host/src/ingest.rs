//! Drop ingestion: dropped image files become image nodes
//!
//! The editor fixes the drop position once, then spawns one read task per
//! accepted file. Each task reads, hashes and stores its bytes on its own
//! thread and reports back over a channel; the editor applies results in
//! completion order.

use crossbeam_channel::Sender;
use log::debug;
use offimg_core::data_uri::DataUri;
use offimg_core::{HashAlgorithm, ImageAttrs, StoreError, StoreHandle};
use regex::{Regex, RegexBuilder};
use std::io::Read;
use std::thread;

use crate::error::IngestError;
use crate::event::{DroppedFile, FileSource};
use crate::sniff;

/// Selects dropped files by declared MIME type
#[derive(Debug, Clone)]
pub struct MimeFilter {
    pattern: Regex,
}

impl MimeFilter {
    /// Build a case-insensitive filter
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, file: &DroppedFile) -> bool {
        self.pattern.is_match(&file.mime)
    }
}

/// Per-drop settings shared by every read task
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub generation: u64,
    pub pos: usize,
    pub store: StoreHandle,
    pub algorithm: HashAlgorithm,
    pub max_bytes: u64,
}

/// A file that was read and turned into node attributes
#[derive(Debug)]
pub struct IngestedImage {
    pub attrs: ImageAttrs,
    /// Set when the bytes could not be written to the store. The node is
    /// still inserted, without a content hash.
    pub store_error: Option<StoreError>,
}

/// Result of one read task
#[derive(Debug)]
pub struct IngestResult {
    pub generation: u64,
    pub pos: usize,
    pub name: String,
    /// Key written to the store, whatever happens to the node afterwards
    pub stored_hash: Option<String>,
    pub outcome: Result<IngestedImage, IngestError>,
}

/// Spawn the read task for one file
pub fn spawn_read(file: DroppedFile, ctx: IngestContext, result_tx: Sender<IngestResult>) {
    thread::spawn(move || {
        let name = file.name.clone();
        let outcome = ingest_file(file, &ctx);
        let stored_hash = outcome
            .as_ref()
            .ok()
            .and_then(|ingested| ingested.attrs.content_hash.clone());
        let result = IngestResult {
            generation: ctx.generation,
            pos: ctx.pos,
            name,
            stored_hash,
            outcome,
        };
        if result_tx.send(result).is_err() {
            debug!("editor gone, dropping ingest result");
        }
    });
}

/// Read, hash and store one file
pub fn ingest_file(file: DroppedFile, ctx: &IngestContext) -> Result<IngestedImage, IngestError> {
    let DroppedFile { name, mime, source } = file;
    let bytes = read_source(&name, source, ctx.max_bytes)?;
    if bytes.is_empty() {
        return Err(IngestError::Empty { name });
    }

    // Nothing reaches the store unless it can be shown as an image
    let mime = normalize_mime(&mime, &bytes);
    if !mime.starts_with("image/") {
        return Err(IngestError::NotAnImage { name, mime });
    }

    let hash = ctx.algorithm.digest(&bytes);
    let store_error = ctx.store.set_item(&hash, &bytes).err();
    let src = DataUri::new(mime, bytes).to_string();

    let mut attrs = ImageAttrs::new(src);
    if store_error.is_none() {
        attrs = attrs.with_hash(hash);
    }
    if !name.is_empty() {
        attrs = attrs.with_alt(name);
    }

    Ok(IngestedImage { attrs, store_error })
}

/// Use the declared type when it is an image type, else sniff the bytes
fn normalize_mime(declared: &str, bytes: &[u8]) -> String {
    let declared = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if declared.starts_with("image/") {
        return declared;
    }
    sniff::sniff_mime(bytes)
        .map(str::to_string)
        .unwrap_or(declared)
}

fn read_source(name: &str, source: FileSource, max_bytes: u64) -> Result<Vec<u8>, IngestError> {
    let too_large = |size: u64| IngestError::TooLarge {
        name: name.to_string(),
        size,
        max: max_bytes,
    };
    let io = |source: std::io::Error| IngestError::Io {
        name: name.to_string(),
        source,
    };

    match source {
        FileSource::Bytes(bytes) => {
            if bytes.len() as u64 > max_bytes {
                return Err(too_large(bytes.len() as u64));
            }
            Ok(bytes)
        }
        FileSource::Path(path) => {
            let size = std::fs::metadata(&path).map_err(io)?.len();
            if size > max_bytes {
                return Err(too_large(size));
            }
            std::fs::read(&path).map_err(io)
        }
        FileSource::Reader(reader) => {
            let mut bytes = Vec::new();
            reader
                .take(max_bytes.saturating_add(1))
                .read_to_end(&mut bytes)
                .map_err(io)?;
            if bytes.len() as u64 > max_bytes {
                return Err(too_large(bytes.len() as u64));
            }
            Ok(bytes)
        }
    }
}
