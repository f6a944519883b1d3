//! Finds `require('...')` declarations in a module's text.
//!
//! The scan is lexical: comments, strings, template literals and regular
//! expression literals are stepped over, so look-alikes inside them never
//! become candidates. Only calls whose single argument is a string literal
//! are reported; anything else is left for the runtime.

use crate::core::line_index::LineIndex;
use crate::core::models::Span;
use once_cell::sync::Lazy;
use regex::Regex;

const CALL_NAME: &str = "require";

// `var name = ` directly in front of a require call
static DECLARATION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:var|let|const)\s+[A-Za-z_$][\w$]*\s*=\s*\z").unwrap()
});

/// Keywords after which a `/` starts a regular expression
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireCandidate {
    pub specifier: String,
    pub call: Span,
    pub excision: Span,
    /// One-based position of the call
    pub line: usize,
    pub column: usize,
}

pub fn scan(source: &str) -> Vec<RequireCandidate> {
    Scanner::new(source).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Punct(u8),
    Keyword,
    Value,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    prev: Prev,
    lines: LineIndex,
    candidates: Vec<RequireCandidate>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            prev: Prev::Start,
            lines: LineIndex::new(src),
            candidates: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<RequireCandidate> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if let Some(len) = unicode_space_len(self.src, self.pos) {
                self.pos += len;
                continue;
            }
            match b {
                b'/' if self.peek(1) == Some(b'/') => self.pos = line_end(self.bytes, self.pos),
                b'/' if self.peek(1) == Some(b'*') => self.pos = block_comment_end(self.bytes, self.pos),
                b'\'' | b'"' => {
                    self.pos = string_end(self.bytes, self.pos).unwrap_or_else(|stop| stop);
                    self.prev = Prev::Value;
                }
                b'`' => {
                    self.pos = template_end(self.bytes, self.pos);
                    self.prev = Prev::Value;
                }
                b'/' if self.regex_allowed() => {
                    self.pos = regex_end(self.bytes, self.pos);
                    self.prev = Prev::Value;
                }
                b'0'..=b'9' => {
                    while self.pos < self.bytes.len()
                        && (is_ident_char(self.bytes[self.pos]) || self.bytes[self.pos] == b'.')
                    {
                        self.pos += 1;
                    }
                    self.prev = Prev::Value;
                }
                b if is_ident_start(b) => self.identifier(),
                b if b.is_ascii_whitespace() => self.pos += 1,
                b')' | b']' => {
                    self.pos += 1;
                    self.prev = Prev::Value;
                }
                _ => {
                    self.pos += 1;
                    self.prev = Prev::Punct(b);
                }
            }
        }

        self.candidates
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn regex_allowed(&self) -> bool {
        matches!(self.prev, Prev::Start | Prev::Keyword | Prev::Punct(_))
    }

    fn identifier(&mut self) {
        let src = self.src;
        let start = self.pos;
        while self.pos < self.bytes.len()
            && is_ident_char(self.bytes[self.pos])
            && unicode_space_len(src, self.pos).is_none()
        {
            self.pos += 1;
        }
        let word = &src[start..self.pos];

        // `obj.require(...)` is a method call, not a declaration
        if word == CALL_NAME && self.prev != Prev::Punct(b'.') {
            if let Some(candidate) = self.match_call(start, self.pos) {
                self.pos = candidate.call.end;
                self.prev = Prev::Value;
                self.candidates.push(candidate);
                return;
            }
        }

        self.prev = if REGEX_KEYWORDS.contains(&word) {
            Prev::Keyword
        } else {
            Prev::Value
        };
    }

    /// `require` `(` string-literal `)` with any whitespace in between.
    fn match_call(&self, start: usize, after_name: usize) -> Option<RequireCandidate> {
        let bytes = self.bytes;

        let open = skip_whitespace(bytes, after_name);
        if bytes.get(open) != Some(&b'(') {
            return None;
        }

        let literal = skip_whitespace(bytes, open + 1);
        if !matches!(bytes.get(literal), Some(b'\'') | Some(b'"')) {
            return None;
        }
        let literal_end = string_end(bytes, literal).ok()?;

        let close = skip_whitespace(bytes, literal_end);
        if bytes.get(close) != Some(&b')') {
            return None;
        }

        let call = Span::new(start, close + 1);
        let (line, column) = self.lines.line_col(self.src, start);

        Some(RequireCandidate {
            specifier: unescape(&self.src[literal + 1..literal_end - 1]),
            call,
            excision: excision_span(self.src, call),
            line,
            column,
        })
    }
}

/// Text to remove for a resolved call.
///
/// A call that forms a whole statement (`require('a');` or
/// `var a = require('a');`) takes the statement with it, and the whole line
/// when nothing else is on it. A call embedded in a larger expression only
/// loses the call itself.
pub fn excision_span(src: &str, call: Span) -> Span {
    let bytes = src.as_bytes();

    let after = skip_horizontal(bytes, call.end);
    let end = match bytes.get(after) {
        Some(b';') => after + 1,
        None | Some(b'\n') | Some(b'\r') | Some(b'}') => call.end,
        Some(b'/') if matches!(bytes.get(after + 1), Some(b'/') | Some(b'*')) => call.end,
        _ => return call,
    };

    match statement_start(src, call.start) {
        Some(start) => widen_to_line(src, Span::new(start, end)),
        None => call,
    }
}

fn statement_start(src: &str, call_start: usize) -> Option<usize> {
    if opens_statement(&src[..call_start]) {
        return Some(call_start);
    }

    let window = src[..call_start]
        .rfind(&[';', '{', '}'][..])
        .map_or(0, |idx| idx + 1);
    let found = DECLARATION_PREFIX.find(&src[window..call_start])?;
    let start = window + found.start();

    opens_statement(&src[..start]).then_some(start)
}

fn opens_statement(head: &str) -> bool {
    matches!(
        head.trim_end_matches(|c: char| c == ' ' || c == '\t' || is_unicode_space(c))
            .as_bytes()
            .last(),
        None | Some(b'\n') | Some(b'\r') | Some(b';') | Some(b'{') | Some(b'}')
    )
}

fn widen_to_line(src: &str, span: Span) -> Span {
    let bytes = src.as_bytes();
    let line_start = src[..span.start].rfind('\n').map_or(0, |idx| idx + 1);
    let line_end = src[span.end..].find('\n').map_or(src.len(), |idx| span.end + idx);

    let blank_before = is_blank(&src[line_start..span.start]);
    let blank_after = is_blank(&src[span.end..line_end]);

    match (blank_before, blank_after) {
        (true, true) if line_end < src.len() => Span::new(line_start, line_end + 1),
        (true, true) => {
            // Last line without a trailing newline: take the break before it
            let mut start = line_start.saturating_sub(1);
            if start > 0 && bytes[start - 1] == b'\r' {
                start -= 1;
            }
            Span::new(start, src.len())
        }
        (false, true) => {
            let start = src[..span.start].trim_end_matches(&[' ', '\t'][..]).len();
            Span::new(start, span.end)
        }
        _ => Span::new(span.start, skip_horizontal(bytes, span.end)),
    }
}

/// Whitespace outside ASCII, including the byte order mark.
fn is_unicode_space(c: char) -> bool {
    !c.is_ascii() && (c.is_whitespace() || c == '\u{FEFF}')
}

/// Byte length of a non-ASCII space starting at `i`.
fn unicode_space_len(src: &str, i: usize) -> Option<usize> {
    if src.as_bytes().get(i).map_or(true, |b| b.is_ascii()) || !src.is_char_boundary(i) {
        return None;
    }
    src[i..].chars().next().filter(|&c| is_unicode_space(c)).map(char::len_utf8)
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == '\u{FEFF}')
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn skip_horizontal(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

fn line_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// `Ok(end)` just past the closing quote, `Err(stop)` when unterminated.
fn string_end(bytes: &[u8], start: usize) -> Result<usize, usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return Err(i),
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(bytes.len())
}

fn template_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = braced_end(bytes, i + 2),
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End of a `${ ... }` body, starting just inside the brace.
fn braced_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 1;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'\'' | b'"' => i = string_end(bytes, i).unwrap_or_else(|stop| stop),
            b'`' => i = template_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = block_comment_end(bytes, i),
            _ => i += 1,
        }
    }
    bytes.len()
}

fn regex_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                return i;
            }
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
