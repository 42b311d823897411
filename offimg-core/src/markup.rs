//! Markup codec for documents
//!
//! A document is markdown. Raw `<img>` tags that carry the hash attribute
//! become image nodes; everything else, including `<img>` tags without a
//! hash and anything inside code, stays as verbatim text.

use std::ops::Range;
use std::sync::OnceLock;

use log::error;
use pulldown_cmark::{Event, Options, Parser};
use regex::Regex;

use crate::doc::{Document, Inline, Part};
use crate::node::{self, MarkupAttrs, ParseContext};

/// Compiled tag and attribute patterns
struct TagScanner {
    img_tag: Regex,
    attr: Regex,
}

impl TagScanner {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            img_tag: Regex::new(r#"(?i)<img\b(?:[^>"']|"[^"]*"|'[^']*')*/?>"#)?,
            attr: Regex::new(
                r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
            )?,
        })
    }
}

/// Shared scanner. `None` only if the patterns fail to compile, in which
/// case markup parses as plain text.
fn scanner() -> Option<&'static TagScanner> {
    static SCANNER: OnceLock<Option<TagScanner>> = OnceLock::new();
    SCANNER
        .get_or_init(|| match TagScanner::new() {
            Ok(scanner) => Some(scanner),
            Err(e) => {
                error!("failed to build markup scanner: {}", e);
                None
            }
        })
        .as_ref()
}

/// Parse the attributes of a single `<img ...>` tag
pub fn parse_tag_attrs(tag: &str) -> MarkupAttrs {
    let inner = tag
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    // Skip the tag name
    let inner = inner.get(3..).unwrap_or_default();

    let Some(scanner) = scanner() else {
        return MarkupAttrs::new();
    };
    scanner
        .attr
        .captures_iter(inner)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| node::unescape_attr(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Byte ranges of raw HTML in a markdown source
fn html_ranges(source: &str) -> Vec<Range<usize>> {
    Parser::new_ext(source, Options::empty())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Html(_) | Event::InlineHtml(_) => Some(range),
            _ => None,
        })
        .collect()
}

/// Split markdown source into text runs and image node attributes
pub fn parse_parts(source: &str, ctx: &ParseContext) -> Vec<Part> {
    let mut images: Vec<(Range<usize>, node::ImageAttrs)> = Vec::new();
    let Some(scanner) = scanner() else {
        return vec![Part::Text(source.to_string())];
    };

    for range in html_ranges(source) {
        let Some(html) = source.get(range.clone()) else {
            continue;
        };
        for m in scanner.img_tag.find_iter(html) {
            let attrs = parse_tag_attrs(m.as_str());
            if let Some(parsed) = node::parse(&attrs, ctx) {
                let start = range.start + m.start();
                images.push((start..start + m.len(), parsed));
            }
        }
    }

    images.sort_by_key(|(range, _)| range.start);

    let mut parts = Vec::new();
    let mut cursor = 0;
    for (range, attrs) in images {
        // Ranges from adjacent HTML events can overlap
        if range.start < cursor {
            continue;
        }
        if range.start > cursor {
            parts.push(Part::Text(source[cursor..range.start].to_string()));
        }
        parts.push(Part::Image(attrs));
        cursor = range.end;
    }
    if cursor < source.len() {
        parts.push(Part::Text(source[cursor..].to_string()));
    }
    parts
}

/// Parse markdown source into a document
pub fn parse_document(source: &str, ctx: &ParseContext) -> Document {
    Document::from_parts(ctx.algorithm, parse_parts(source, ctx))
}

/// Serialize a document back to markdown
pub fn render_document(doc: &Document) -> String {
    let mut out = String::new();
    for inline in doc.content() {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Image(node) => out.push_str(&doc.render_node(node)),
        }
    }
    out
}
