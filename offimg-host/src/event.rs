//! Host event types

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

/// Pointer position in viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coords {
    pub left: f32,
    pub top: f32,
}

impl Coords {
    pub fn new(left: f32, top: f32) -> Self {
        Self { left, top }
    }
}

/// Maps a viewport point to a document position. Implemented by the host view.
pub trait CoordinateMap {
    fn pos_at_coords(&self, coords: Coords) -> Option<usize>;
}

impl<F: Fn(Coords) -> Option<usize>> CoordinateMap for F {
    fn pos_at_coords(&self, coords: Coords) -> Option<usize> {
        self(coords)
    }
}

/// Where a dropped file's bytes come from
pub enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FileSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            FileSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// One file carried by a drop
#[derive(Debug)]
pub struct DroppedFile {
    pub name: String,
    /// Declared MIME type; may be empty
    pub mime: String,
    pub source: FileSource,
}

impl DroppedFile {
    pub fn from_path(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            mime: mime.into(),
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            source: FileSource::Bytes(bytes),
        }
    }
}

/// A drop interaction on the document surface
#[derive(Debug, Default)]
pub struct DropEvent {
    /// `None` when the drop carries no file payload at all
    pub files: Option<Vec<DroppedFile>>,
    pub coords: Coords,
}

impl DropEvent {
    pub fn with_files(files: Vec<DroppedFile>, coords: Coords) -> Self {
        Self {
            files: Some(files),
            coords,
        }
    }
}

/// What the editor did with a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropHandling {
    /// Not ours: the host should run its default handling
    PassThrough,
    /// Default handling suppressed; `files` reads were started for `pos`
    Intercepted { pos: usize, files: usize },
}

impl DropHandling {
    pub fn is_intercepted(&self) -> bool {
        matches!(self, DropHandling::Intercepted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_coordinate_map() {
        let map = |c: Coords| Some(c.left as usize);
        assert_eq!(map.pos_at_coords(Coords::new(4.0, 0.0)), Some(4));
    }

    #[test]
    fn test_dropped_file_from_path_takes_name() {
        let file = DroppedFile::from_path("/tmp/pictures/cat.png", "image/png");
        assert_eq!(file.name, "cat.png");
        assert!(matches!(file.source, FileSource::Path(_)));
    }

    #[test]
    fn test_default_drop_has_no_payload() {
        let event = DropEvent::default();
        assert!(event.files.is_none());
    }
}
