//! HTML escaping and the quote emphasis convention.
//!
//! Curated quote text marks emphasis with a double asterisk delimiter:
//! `the **analytical engine** weaves`. [`render_emphasis`] turns each
//! delimited span into `<em>…</em>` and escapes everything else. Span
//! contents are escaped too and never re-scanned, so nothing inside a quote
//! can produce markup other than the `<em>` wrapper.

const DELIMITER: &str = "**";

/// Escape text for inclusion in HTML element content or attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render quote text to HTML, translating `**span**` to `<em>span</em>`.
///
/// A delimiter without a closing partner, or an empty `****` pair, is kept
/// as literal text.
pub fn render_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(open) = rest.find(DELIMITER) {
        let after_open = &rest[open + DELIMITER.len()..];
        match after_open.find(DELIMITER) {
            Some(close) if close > 0 => {
                out.push_str(&html_escape(&rest[..open]));
                out.push_str("<em>");
                out.push_str(&html_escape(&after_open[..close]));
                out.push_str("</em>");
                rest = &after_open[close + DELIMITER.len()..];
            }
            _ => {
                out.push_str(&html_escape(&rest[..open + DELIMITER.len()]));
                rest = after_open;
            }
        }
    }

    out.push_str(&html_escape(rest));
    out
}

/// Remove emphasis delimiters, leaving plain text (for previews and titles).
pub fn strip_emphasis(text: &str) -> String {
    text.replace(DELIMITER, "")
}
