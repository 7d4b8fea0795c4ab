//! Textual scanning of `@import` statements.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Both the closure assembler and the backend source preparation need to find
//! import statements without a full Sass parser. Comments are masked first so
//! that commented-out imports are ignored; byte offsets are preserved so match
//! ranges can be used to splice the original text.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches an `@import` rule and captures its argument list.
///
/// The argument list may span lines (`@import "a",\n "b";`). A rule missing its
/// terminating semicolon is accepted only at end of input.
static IMPORT_STATEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@import\s+([^;{}]+?)\s*(?:;|\z)").unwrap());

/// Matches a module rule (`@use`, `@forward`) through its semicolon.
static MODULE_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(?:use|forward)\s+[^;{}]+;").unwrap());

/// One argument of an `@import` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportArg {
    /// Argument text as written (quotes included).
    pub raw: String,
    /// Stylesheet specifier, or `None` for plain CSS imports
    /// (`url(...)`, remote URLs, media-qualified imports).
    pub specifier: Option<String>,
}

/// An `@import` rule located in some source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Byte range of the whole rule, including the trailing semicolon.
    pub range: Range<usize>,
    pub args: Vec<ImportArg>,
}

impl ImportStatement {
    /// Stylesheet specifiers in argument order.
    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| arg.specifier.as_deref())
    }
}

/// Find every `@import` rule outside comments, in source order.
pub fn scan_imports(source: &str) -> Vec<ImportStatement> {
    let masked = mask_comments(source);
    IMPORT_STATEMENT
        .captures_iter(&masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let args = caps.get(1)?.as_str();
            Some(ImportStatement {
                range: whole.range(),
                args: split_args(args).into_iter().map(parse_arg).collect(),
            })
        })
        .collect()
}

/// Byte ranges of `@use` and `@forward` rules outside comments, in source order.
pub fn scan_module_rules(source: &str) -> Vec<Range<usize>> {
    let masked = mask_comments(source);
    MODULE_RULE.find_iter(&masked).map(|m| m.range()).collect()
}

/// Replace comment bodies with spaces, keeping newlines and byte offsets.
///
/// Quoted strings and unquoted `url(...)` tokens are copied verbatim so that
/// `//` inside them is not taken as a comment.
pub fn mask_comments(source: &str) -> String {
    #[derive(Clone, Copy)]
    enum State {
        Code,
        Quoted(char),
        Url,
        Line,
        Block,
    }

    fn blank(out: &mut String, c: char) {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match (c, chars.peek().copied()) {
                ('/', Some('/')) => {
                    chars.next();
                    out.push_str("  ");
                    state = State::Line;
                }
                ('/', Some('*')) => {
                    chars.next();
                    out.push_str("  ");
                    state = State::Block;
                }
                ('"' | '\'', _) => {
                    out.push(c);
                    state = State::Quoted(c);
                }
                ('(', _) if ends_with_url(&out) => {
                    out.push(c);
                    state = State::Url;
                }
                _ => out.push(c),
            },
            State::Quoted(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote || c == '\n' {
                    state = State::Code;
                }
            }
            State::Url => {
                out.push(c);
                if c == ')' {
                    state = State::Code;
                }
            }
            State::Line => {
                blank(&mut out, c);
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
        }
    }

    out
}

fn ends_with_url(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 3 && bytes[bytes.len() - 3..].eq_ignore_ascii_case(b"url")
}

/// Split an argument list on top-level commas.
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in args.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(args[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_arg(raw: &str) -> ImportArg {
    ImportArg {
        raw: raw.to_string(),
        specifier: quoted_specifier(raw),
    }
}

fn quoted_specifier(raw: &str) -> Option<String> {
    let quote = raw.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }
    let inner = &raw[1..raw.len() - 1];
    if inner.starts_with("http://") || inner.starts_with("https://") || inner.starts_with("//") {
        return None;
    }
    Some(inner.replace(&format!("\\{}", quote), &quote.to_string()))
}
