//! Offline image node: attribute schema, parse and render
//!
//! An image node never trusts the `src` it was parsed from. Parsing keeps
//! the content hash and metadata, and shows a placeholder until the bytes
//! behind the hash are resolved from the content store.

use crate::data_uri::DataUriHeader;
use crate::error::InvalidAttributesError;
use crate::hash::HashAlgorithm;
use crate::placeholder;

/// Node name used by hosts that register nodes by name
pub const NODE_NAME: &str = "imageOffline";

/// Element tag used in markup
pub const TAG: &str = "img";

/// Static description of the node type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSchema {
    pub name: &'static str,
    pub inline: bool,
    pub draggable: bool,
    pub group: &'static str,
    pub tag: &'static str,
    /// Attribute a tag must carry to parse as this node
    pub hash_attr: &'static str,
}

impl NodeSchema {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            name: NODE_NAME,
            inline: true,
            draggable: true,
            group: "inline",
            tag: TAG,
            hash_attr: algorithm.attr_name(),
        }
    }

    /// Parse rule selector, e.g. `img[data-sha512]`
    pub fn selector(&self) -> String {
        format!("{}[{}]", self.tag, self.hash_attr)
    }
}

/// Per-node attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttrs {
    /// Always a renderable URI: resolved bytes or a placeholder
    pub src: String,
    /// Store key; `None` only for content that has not been hashed
    pub content_hash: Option<String>,
    pub alt: Option<String>,
    pub title: Option<String>,
}

impl ImageAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            content_hash: None,
            alt: None,
            title: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Reject attribute sets that would leave the node unrenderable or
    /// point at an impossible store key
    pub fn validate(&self, algorithm: HashAlgorithm) -> Result<(), InvalidAttributesError> {
        validate_src(&self.src)?;
        if let Some(hash) = &self.content_hash {
            if !algorithm.is_valid_digest(hash) {
                return Err(InvalidAttributesError::InvalidHash {
                    hash: hash.clone(),
                    algorithm: algorithm.name(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_src(src: &str) -> Result<(), InvalidAttributesError> {
    if src.trim().is_empty() {
        return Err(InvalidAttributesError::EmptySrc);
    }
    if src.chars().any(char::is_control) {
        return Err(InvalidAttributesError::UnrenderableSrc(
            "contains control characters".to_string(),
        ));
    }

    let scheme = src
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)))
        .ok_or_else(|| InvalidAttributesError::UnrenderableSrc(truncate(src)))?;

    match scheme.as_str() {
        "data" => {
            // Checked without decoding; resolved payloads can be large
            let header = DataUriHeader::parse(src)
                .map_err(|e| InvalidAttributesError::UnrenderableSrc(e.to_string()))?;
            if !header.is_image() {
                return Err(InvalidAttributesError::UnrenderableSrc(format!(
                    "data URI has non-image type {}",
                    header.mime
                )));
            }
            if !header.payload_is_base64() {
                return Err(InvalidAttributesError::UnrenderableSrc(
                    "data URI payload is not base64".to_string(),
                ));
            }
            Ok(())
        }
        "http" | "https" | "blob" | "file" => Ok(()),
        other => Err(InvalidAttributesError::UnrenderableSrc(format!(
            "unsupported scheme {other}"
        ))),
    }
}

fn truncate(src: &str) -> String {
    src.chars().take(32).collect()
}

/// Placeholder geometry and default label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpec {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlaceholderSpec {
    fn default() -> Self {
        Self {
            label: "image".to_string(),
            width: 100,
            height: 100,
        }
    }
}

impl PlaceholderSpec {
    /// Placeholder URI for a node, labelled with its alt text when present
    pub fn render_for(&self, alt: Option<&str>) -> String {
        let label = alt.filter(|a| !a.trim().is_empty()).unwrap_or(&self.label);
        placeholder::render(label, self.width, self.height)
    }
}

/// Everything parsing needs besides the markup itself
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    pub algorithm: HashAlgorithm,
    pub placeholder: PlaceholderSpec,
}

impl ParseContext {
    pub fn schema(&self) -> NodeSchema {
        NodeSchema::new(self.algorithm)
    }
}

/// Markup attribute list of a single element
pub type MarkupAttrs = Vec<(String, String)>;

fn lookup<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Build node attributes from element attributes.
///
/// Returns `None` when the element lacks the hash attribute and therefore
/// does not match the parse rule. Any `src` in the markup is discarded.
pub fn parse(attrs: &[(String, String)], ctx: &ParseContext) -> Option<ImageAttrs> {
    let schema = ctx.schema();
    let hash = lookup(attrs, schema.hash_attr)?;

    let alt = lookup(attrs, "alt").map(str::to_string);
    let title = lookup(attrs, "title").map(str::to_string);
    let src = ctx.placeholder.render_for(alt.as_deref());

    Some(ImageAttrs {
        src,
        content_hash: Some(hash.trim().to_string()).filter(|h| !h.is_empty()),
        alt,
        title,
    })
}

/// One element of output markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedElement {
    pub tag: &'static str,
    pub attrs: MarkupAttrs,
}

impl RenderedElement {
    pub fn get(&self, name: &str) -> Option<&str> {
        lookup(&self.attrs, name)
    }

    /// Serialize as an HTML void element
    pub fn to_html(&self) -> String {
        let mut html = format!("<{}", self.tag);
        for (key, value) in &self.attrs {
            html.push(' ');
            html.push_str(key);
            html.push_str("=\"");
            html.push_str(&escape_attr(value));
            html.push('"');
        }
        html.push('>');
        html
    }
}

/// Render node attributes as a markup element. Every present attribute is
/// copied under its own name; absent optional attributes are omitted.
pub fn render(attrs: &ImageAttrs, algorithm: HashAlgorithm) -> RenderedElement {
    let mut out: MarkupAttrs = vec![("src".to_string(), attrs.src.clone())];
    let optional = [
        (algorithm.attr_name(), &attrs.content_hash),
        ("alt", &attrs.alt),
        ("title", &attrs.title),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            out.push((key.to_string(), value.clone()));
        }
    }
    RenderedElement { tag: TAG, attrs: out }
}

/// Escape an attribute value for double-quoted HTML
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            // Raw line breaks can end an inline HTML block on reparse
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse the entity escapes HTML attribute values commonly carry
pub fn unescape_attr(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            decode_entity(entity).map(|ch| (ch, end + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
