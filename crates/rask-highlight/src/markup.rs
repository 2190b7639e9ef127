// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! HTML rendering of classified tokens.

use crate::lexer::Token;

/// Append `text` to `out` with HTML-significant characters escaped.
pub fn escape_html_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_html_into(text, &mut out);
    out
}

/// Render `tokens` over `source` as a sequence of `<span class="tok-…">`
/// elements. Only token text is escaped; whitespace is emitted bare.
/// Invalid UTF-8 renders as U+FFFD.
pub fn render_html(source: &[u8], tokens: &[Token]) -> String {
    let mut out = String::with_capacity(source.len() * 2);

    for token in tokens {
        let text = String::from_utf8_lossy(&source[token.span.range()]);
        match token.class.css_class() {
            Some(class) => {
                out.push_str("<span class=\"");
                out.push_str(class);
                out.push_str("\">");
                escape_html_into(&text, &mut out);
                out.push_str("</span>");
            }
            None => escape_html_into(&text, &mut out),
        }
    }

    out
}
