//! Text <-> base64 codec
//!
//! UTF-8 text is encoded straight from its bytes. The UTF-16 encodings go
//! through a per-code-unit conversion. Both paths produce the standard
//! padded base64 alphabet, so any decoder can read any encoder's output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Character encodings supported by the codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Label used in `charset=` parameters and error messages
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Utf16Be => "utf-16be",
        }
    }

    /// Look up an encoding by its charset label (case-insensitive)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "utf-16le" | "utf-16" => Some(Encoding::Utf16Le),
            "utf-16be" => Some(Encoding::Utf16Be),
            _ => None,
        }
    }

    fn text_to_bytes(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }

    fn bytes_to_text(self, bytes: Vec<u8>) -> Result<String, DecodeError> {
        let text = match self {
            Encoding::Utf8 => String::from_utf8(bytes).ok(),
            Encoding::Utf16Le => utf16_units(&bytes, u16::from_le_bytes)
                .and_then(|units| String::from_utf16(&units).ok()),
            Encoding::Utf16Be => utf16_units(&bytes, u16::from_be_bytes)
                .and_then(|units| String::from_utf16(&units).ok()),
        };
        text.ok_or(DecodeError::Text {
            encoding: self.label(),
        })
    }
}

fn utf16_units(bytes: &[u8], from: fn([u8; 2]) -> u16) -> Option<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    Some(bytes.chunks_exact(2).map(|c| from([c[0], c[1]])).collect())
}

/// Encode text as base64 using the given character encoding
pub fn encode(text: &str, encoding: Encoding) -> String {
    match encoding {
        Encoding::Utf8 => STANDARD.encode(text.as_bytes()),
        other => STANDARD.encode(other.text_to_bytes(text)),
    }
}

/// Decode base64 back into text using the given character encoding
pub fn decode(payload: &str, encoding: Encoding) -> Result<String, DecodeError> {
    let bytes = decode_bytes(payload)?;
    encoding.bytes_to_text(bytes)
}

/// Encode raw bytes as base64
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 into raw bytes
pub fn decode_bytes(payload: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(payload.trim())?)
}
