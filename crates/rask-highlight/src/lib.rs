// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lexical highlighting for Rask snippets.
//!
//! Splits source bytes into classified tokens without parsing, so code that
//! doesn't compile (which is the point of a compile-fail example) still
//! highlights. The tokens always cover the input exactly.
//!
//! ```
//! let source = b"func main() { }";
//! let tokens = rask_highlight::highlight(source);
//! let html = rask_highlight::render_html(source, &tokens);
//! assert!(html.starts_with("<span class=\"tok-kw\">func</span>"));
//! ```

mod lexer;
mod markup;
mod span;

pub use lexer::{highlight, Token, TokenClass};
pub use markup::{escape_html, escape_html_into, render_html};
pub use span::Span;
