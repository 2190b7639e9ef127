// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Token classification using logos.
//!
//! Unlike the compiler's lexer this one never rejects input. Every byte ends
//! up in exactly one token, and anything logos can't match becomes an
//! `Error` token so a broken snippet still renders.

use logos::Logos;

use crate::Span;

/// Raw token type for logos. Keywords are recognised after the fact from
/// `Ident` slices, since highlighting only needs the class.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    // === Comments ===
    #[regex(r"//[^\n]*")]
    LineComment,

    // Block comments - nesting handled by the callback
    #[token("/*", block_comment)]
    BlockComment,

    // === Literals ===
    // Scanned by hand so a malformed literal never needs logos to backtrack
    #[regex(r"[0-9]", number)]
    Number,

    #[token("'", char_literal)]
    Char(Closing),

    #[token("\"", string_literal)]
    String(Closing),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // === Operators ===
    #[token("..=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("??")]
    #[token("?.")]
    #[token("..")]
    #[token("->")]
    #[token("=>")]
    #[token("::")]
    #[token("<<")]
    #[token(">>")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("=")]
    #[token("<")]
    #[token(">")]
    #[token("!")]
    #[token("?")]
    #[token("@")]
    #[token(".")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("~")]
    Operator,

    // === Delimiters ===
    #[token("{")]
    #[token("}")]
    #[token("(")]
    #[token(")")]
    #[token("[")]
    #[token("]")]
    #[token(":")]
    #[token(";")]
    #[token(",")]
    Punct,
}

/// Consume a (possibly nested) block comment. An unterminated comment runs
/// to the end of the input.
fn block_comment(lexer: &mut logos::Lexer<RawToken>) {
    let mut depth = 1;
    let mut chars = lexer.remainder().chars().peekable();
    let mut consumed = 0;

    while depth > 0 {
        match chars.next() {
            Some('/') if chars.peek() == Some(&'*') => {
                chars.next();
                consumed += 2;
                depth += 1;
            }
            Some('*') if chars.peek() == Some(&'/') => {
                chars.next();
                consumed += 2;
                depth -= 1;
            }
            Some(c) => consumed += c.len_utf8(),
            None => break,
        }
    }

    lexer.bump(consumed);
}

/// Whether a quoted literal found its closing quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
    Closed,
    Unclosed,
}

/// Consume the rest of a numeric literal: radix prefixes, digits, `_`,
/// type suffixes, a fraction and an exponent.
fn number(lexer: &mut logos::Lexer<RawToken>) {
    let rest = lexer.remainder().as_bytes();
    let word = |from: usize| {
        rest[from..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count()
    };

    let mut end = word(0);
    let radix = lexer.slice() == "0" && matches!(rest.first(), Some(b'x' | b'b' | b'o'));
    if radix {
        lexer.bump(end);
        return;
    }
    if rest.get(end) == Some(&b'.') && rest.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end += 1 + word(end + 1);
    }
    if matches!(rest.get(end.wrapping_sub(1)), Some(b'e' | b'E'))
        && matches!(rest.get(end), Some(b'+' | b'-'))
        && rest.get(end + 1).is_some_and(u8::is_ascii_digit)
    {
        end += 1 + word(end + 1);
    }

    lexer.bump(end);
}

/// Consume a string literal after its opening quote. `"""` opens a raw
/// multi-line string; a plain string stops at an unescaped newline.
fn string_literal(lexer: &mut logos::Lexer<RawToken>) -> Closing {
    let rest = lexer.remainder();

    if let Some(body) = rest.strip_prefix("\"\"") {
        return match body.find("\"\"\"") {
            Some(end) => {
                lexer.bump(2 + end + 3);
                Closing::Closed
            }
            None => {
                lexer.bump(rest.len());
                Closing::Unclosed
            }
        };
    }

    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                lexer.bump(i + 1);
                return Closing::Closed;
            }
            '\n' => {
                lexer.bump(i);
                return Closing::Unclosed;
            }
            '\\' => {
                if let Some((j, escaped)) = chars.next() {
                    if escaped == '\n' {
                        lexer.bump(j);
                        return Closing::Unclosed;
                    }
                }
            }
            _ => {}
        }
    }

    lexer.bump(rest.len());
    Closing::Unclosed
}

/// Consume a character literal after its opening quote. When no closing
/// quote follows, only the opening quote is taken.
fn char_literal(lexer: &mut logos::Lexer<RawToken>) -> Closing {
    let rest = lexer.remainder();
    let mut chars = rest.char_indices();

    let end = match chars.next() {
        Some((_, '\\')) => match chars.next() {
            Some((i, 'u')) if rest[i + 1..].starts_with('{') => {
                match rest[i + 1..].find('}') {
                    Some(close) if close <= 7 => i + 1 + close + 1,
                    _ => return Closing::Unclosed,
                }
            }
            Some((_, '\n')) | None => return Closing::Unclosed,
            Some((i, c)) => i + c.len_utf8(),
        },
        Some((_, '\'' | '\n')) | None => return Closing::Unclosed,
        Some((i, c)) => i + c.len_utf8(),
    };

    if rest[end..].starts_with('\'') {
        lexer.bump(end + 1);
        Closing::Closed
    } else {
        Closing::Unclosed
    }
}

const KEYWORDS: &[&str] = &[
    "as", "asm", "assert", "benchmark", "break", "check", "comptime", "const", "continue",
    "deliver", "else", "ensure", "enum", "export", "extend", "for", "func", "if", "import", "in",
    "is", "lazy", "let", "loop", "match", "native", "own", "public", "return", "select", "spawn",
    "spawn_raw", "spawn_thread", "step", "struct", "take", "test", "timeout", "trait", "type",
    "unsafe", "using", "where", "while", "with",
];

const LITERAL_WORDS: &[&str] = &["false", "none", "null", "true"];

const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "char", "f32", "f64", "i128", "i16", "i32", "i64", "i8", "isize", "string", "u128",
    "u16", "u32", "u64", "u8", "usize", "void",
];

/// The highlighting class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Whitespace,
    Comment,
    Keyword,
    /// `true`, `false`, `none`, `null`
    Literal,
    Type,
    Function,
    Ident,
    Number,
    String,
    Char,
    Operator,
    Punct,
    /// Bytes that didn't form any recognisable token
    Error,
}

impl TokenClass {
    /// CSS class for the rendered span. Whitespace is emitted bare.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            TokenClass::Whitespace => None,
            TokenClass::Comment => Some("tok-comment"),
            TokenClass::Keyword => Some("tok-kw"),
            TokenClass::Literal => Some("tok-null"),
            TokenClass::Type => Some("tok-type"),
            TokenClass::Function => Some("tok-fn"),
            TokenClass::Ident => Some("tok-ident"),
            TokenClass::Number => Some("tok-number"),
            TokenClass::String => Some("tok-str"),
            TokenClass::Char => Some("tok-char"),
            TokenClass::Operator => Some("tok-op"),
            TokenClass::Punct => Some("tok-punct"),
            TokenClass::Error => Some("tok-err"),
        }
    }
}

/// A classified byte range of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub class: TokenClass,
    pub span: Span,
}

/// Classify every byte of `source`.
///
/// The returned spans are contiguous, in order, and cover the whole input,
/// so concatenating `source[span]` for each token gives back `source`.
/// Invalid UTF-8 sequences become `Error` tokens.
pub fn highlight(source: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    for chunk in source.utf8_chunks() {
        let valid = chunk.valid();
        lex_str(valid, offset, &mut tokens);
        offset += valid.len();

        let invalid = chunk.invalid();
        if !invalid.is_empty() {
            push(&mut tokens, TokenClass::Error, Span::new(offset, offset + invalid.len()));
            offset += invalid.len();
        }
    }

    refine(source, &mut tokens);
    tokens
}

/// Lex one valid UTF-8 run. `base` is its byte offset in the full input.
fn lex_str(text: &str, base: usize, tokens: &mut Vec<Token>) {
    let mut lexer = RawToken::lexer(text);
    let mut cursor = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();

        // logos never skips here, but a gap must still be accounted for
        if span.start > cursor {
            push(tokens, TokenClass::Error, Span::new(cursor, span.start).offset(base));
        }

        let class = match result {
            Ok(raw) => classify(raw, lexer.slice()),
            Err(()) => TokenClass::Error,
        };
        push(tokens, class, Span::new(span.start, span.end).offset(base));
        cursor = span.end;
    }

    if cursor < text.len() {
        push(tokens, TokenClass::Error, Span::new(cursor, text.len()).offset(base));
    }
}

fn classify(raw: RawToken, slice: &str) -> TokenClass {
    match raw {
        RawToken::Whitespace => TokenClass::Whitespace,
        RawToken::LineComment | RawToken::BlockComment => TokenClass::Comment,
        RawToken::Number => TokenClass::Number,
        RawToken::Char(Closing::Closed) => TokenClass::Char,
        RawToken::String(Closing::Closed) => TokenClass::String,
        RawToken::Char(Closing::Unclosed) | RawToken::String(Closing::Unclosed) => {
            TokenClass::Error
        }
        RawToken::Operator => TokenClass::Operator,
        RawToken::Punct => TokenClass::Punct,
        RawToken::Ident => {
            if KEYWORDS.contains(&slice) {
                TokenClass::Keyword
            } else if LITERAL_WORDS.contains(&slice) {
                TokenClass::Literal
            } else {
                TokenClass::Ident
            }
        }
    }
}

/// Append a token, folding consecutive error bytes into one token.
fn push(tokens: &mut Vec<Token>, class: TokenClass, span: Span) {
    if span.is_empty() {
        return;
    }
    if class == TokenClass::Error {
        if let Some(last) = tokens.last_mut() {
            if last.class == TokenClass::Error && last.span.end == span.start {
                last.span.end = span.end;
                return;
            }
        }
    }
    tokens.push(Token { class, span });
}

/// Second pass: identifiers that name types or are called like functions.
fn refine(source: &[u8], tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if tokens[i].class != TokenClass::Ident {
            continue;
        }
        let text = &source[tokens[i].span.range()];

        if is_type_name(text) {
            tokens[i].class = TokenClass::Type;
            continue;
        }

        let next = tokens[i + 1..]
            .iter()
            .find(|t| !matches!(t.class, TokenClass::Whitespace | TokenClass::Comment));
        if let Some(next) = next {
            if &source[next.span.range()] == b"(" {
                tokens[i].class = TokenClass::Function;
            }
        }
    }
}

fn is_type_name(text: &[u8]) -> bool {
    if text.first().is_some_and(|b| b.is_ascii_uppercase()) {
        return true;
    }
    PRIMITIVE_TYPES.iter().any(|p| p.as_bytes() == text)
}
