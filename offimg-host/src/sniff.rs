//! MIME detection for stored image bytes

use offimg_core::data_uri::DataUri;
use offimg_core::DecodeError;

/// Guess the MIME type of image bytes from their content
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(format.to_mime_type());
    }
    looks_like_svg(bytes).then_some("image/svg+xml")
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let Ok(text) = std::str::from_utf8(head) else {
        // The 1024 byte cut may land inside a multi-byte character
        return String::from_utf8_lossy(head).trim_start().starts_with("<svg");
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

/// Encode stored bytes as a displayable `data:` URI
pub fn display_uri(bytes: Vec<u8>) -> Result<String, DecodeError> {
    let mime = sniff_mime(&bytes).ok_or(DecodeError::UnsupportedContent)?;
    Ok(DataUri::new(mime, bytes).to_string())
}
