//! Deterministic SVG placeholders for unresolved images

use crate::codec::{self, Encoding};

/// Prefix of every placeholder URI
pub const PLACEHOLDER_PREFIX: &str = "data:image/svg+xml;charset=utf-8;base64,";

/// Render a placeholder image showing `label`, as a `data:` URI.
///
/// Identical inputs always produce identical output. Zero dimensions are
/// clamped to one pixel.
pub fn render(label: &str, width: u32, height: u32) -> String {
    let svg = render_svg(label, width, height);
    format!("{}{}", PLACEHOLDER_PREFIX, codec::encode(&svg, Encoding::Utf8))
}

/// Whether `src` was produced by [`render`]
pub fn is_placeholder(src: &str) -> bool {
    src.starts_with(PLACEHOLDER_PREFIX)
}

/// The raw SVG markup behind a placeholder
pub fn render_svg(label: &str, width: u32, height: u32) -> String {
    let width = width.max(1);
    let height = height.max(1);
    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;

    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" version="1.1">"#,
            r##"<rect width="{w}" height="{h}" stroke="black" stroke-width="6" fill="#cccc"/>"##,
            r#"<text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="middle">{label}</text>"#,
            "</svg>"
        ),
        w = width,
        h = height,
        cx = cx,
        cy = cy,
        label = escape_xml(label),
    )
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            // Not valid XML 1.0 characters
            c if c.is_control() => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg_of(uri: &str) -> String {
        let payload = uri.strip_prefix(PLACEHOLDER_PREFIX).unwrap();
        codec::decode(payload, Encoding::Utf8).unwrap()
    }

    fn parses_as_svg(svg: &str) -> bool {
        resvg::usvg::Tree::from_str(svg, &resvg::usvg::Options::default()).is_ok()
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render("photo.png", 100, 100);
        let b = render("photo.png", 100, 100);
        assert_eq!(a, b);
        assert_ne!(a, render("photo.png", 100, 101));
        assert_ne!(a, render("other.png", 100, 100));
    }

    #[test]
    fn test_render_prefix() {
        assert!(render("", 1, 1).starts_with("data:image/svg+xml;charset=utf-8;base64,"));
        assert!(is_placeholder(&render("x", 10, 10)));
        assert!(!is_placeholder("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_render_embeds_label_and_size() {
        let svg = svg_of(&render("loading", 120, 80));
        assert!(svg.contains(r#"width="120""#));
        assert!(svg.contains(r#"height="80""#));
        assert!(svg.contains(r#"x="60" y="40""#));
        assert!(svg.contains(">loading</text>"));
        assert!(parses_as_svg(&svg));
    }

    #[test]
    fn test_odd_dimensions_center_on_half_pixel() {
        let svg = svg_of(&render("a", 101, 33));
        assert!(svg.contains(r#"x="50.5" y="16.5""#));
    }

    #[test]
    fn test_zero_dimensions_are_clamped() {
        let svg = svg_of(&render("a", 0, 0));
        assert!(svg.contains(r#"width="1" height="1""#));
    }

    #[test]
    fn test_markup_in_label_is_neutralised() {
        let label = r#"</text><script>alert("x")</script> & 'q'"#;
        let svg = svg_of(&render(label, 100, 100));
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;/text&gt;&lt;script&gt;"));
        assert!(svg.contains("&amp; &apos;q&apos;"));
        assert!(parses_as_svg(&svg));
    }

    #[test]
    fn test_control_characters_are_dropped() {
        assert_eq!(escape_xml("a\u{0}b\u{1b}c"), "abc");
        assert_eq!(escape_xml("line\nbreak"), "line\nbreak");
        assert!(parses_as_svg(&render_svg("bad\u{0}label", 10, 10)));
    }

    #[test]
    fn test_xml_noncharacters_are_dropped() {
        assert_eq!(escape_xml("a\u{FFFE}b\u{FFFF}c"), "abc");
        assert!(parses_as_svg(&render_svg("x\u{FFFF}", 10, 10)));
    }

    #[test]
    fn test_unicode_label() {
        let svg = svg_of(&render("画像", 50, 50));
        assert!(svg.contains("画像"));
    }
}
