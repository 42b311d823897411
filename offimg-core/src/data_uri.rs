//! `data:` URIs for image payloads

use std::fmt;

use crate::codec;
use crate::error::DecodeError;

/// A parsed `data:<mime>[;charset=..];base64,<payload>` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub charset: Option<String>,
    pub bytes: Vec<u8>,
}

impl DataUri {
    /// Create a data URI for raw bytes of the given MIME type
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            charset: None,
            bytes,
        }
    }

    /// Attach a charset parameter
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Whether the payload is an image type
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    /// Parse a `data:` URI. Only base64 payloads are accepted.
    pub fn parse(uri: &str) -> Result<Self, DecodeError> {
        let header = DataUriHeader::parse(uri)?;
        Ok(Self {
            bytes: codec::decode_bytes(header.payload)?,
            mime: header.mime,
            charset: header.charset,
        })
    }
}

/// The parameters of a `data:` URI with its payload still encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUriHeader<'a> {
    pub mime: String,
    pub charset: Option<String>,
    pub payload: &'a str,
}

impl<'a> DataUriHeader<'a> {
    /// Split a base64 `data:` URI without decoding its payload
    pub fn parse(uri: &'a str) -> Result<Self, DecodeError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| DecodeError::DataUri("missing `data:` scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| DecodeError::DataUri("missing `,` separator".to_string()))?;

        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if mime.is_empty() {
            return Err(DecodeError::DataUri("missing MIME type".to_string()));
        }

        let mut charset = None;
        let mut base64 = false;
        for param in params {
            let param = param.trim();
            if param.eq_ignore_ascii_case("base64") {
                base64 = true;
            } else if let Some((key, value)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("charset") {
                    charset = Some(value.trim().to_string());
                }
            }
        }

        if !base64 {
            return Err(DecodeError::DataUri("payload is not base64".to_string()));
        }

        Ok(Self {
            mime,
            charset,
            payload,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    /// Whether the payload only uses the standard base64 alphabet
    pub fn payload_is_base64(&self) -> bool {
        let payload = self.payload.trim();
        let body = payload.trim_end_matches('=');
        payload.len() - body.len() <= 2
            && body
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{}", self.mime)?;
        if let Some(charset) = &self.charset {
            write!(f, ";charset={}", charset)?;
        }
        write!(f, ";base64,{}", codec::encode_bytes(&self.bytes))
    }
}
