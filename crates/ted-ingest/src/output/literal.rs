//! List literals for text-list cells
//!
//! Lists are written the way Python's `repr` writes a list of strings,
//! `['first', "it's"]`, so downstream notebooks can read cells with
//! `ast.literal_eval`. Control characters, separators other than the ASCII
//! space, and the common invisible format characters are escaped as `repr`
//! does. Rarer non-printable code points (unassigned or private use) are
//! written raw; that changes the text of the cell, not the decoded value.
//! [`parse_list`] reads the same syntax back and recovers the original
//! strings exactly.

use crate::error::{ExtractError, Result};
use std::fmt::Write;

/// Render strings as a list literal
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        quote(item.as_ref(), &mut out);
    }
    out.push(']');
    out
}

fn quote(s: &str, out: &mut String) {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            },
            c if !is_printable(c) => {
                let code = u32::from(c);
                // Infallible for String
                let _ = match code {
                    0..=0xff => write!(out, "\\x{code:02x}"),
                    0x100..=0xffff => write!(out, "\\u{code:04x}"),
                    _ => write!(out, "\\U{code:08x}"),
                };
            },
            c => out.push(c),
        }
    }
    out.push(delimiter);
}

/// False for what `repr` escapes: controls, separators and format characters
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{ad}'
                | '\u{600}'..='\u{605}'
                | '\u{61c}'
                | '\u{6dd}'
                | '\u{70f}'
                | '\u{180e}'
                | '\u{200b}'..='\u{200f}'
                | '\u{202a}'..='\u{202e}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{206f}'
                | '\u{feff}'
                | '\u{fff9}'..='\u{fffb}'
        ))
}

/// Parse a list literal produced by [`format_list`] (or by Python)
pub fn parse_list(input: &str) -> Result<Vec<String>> {
    Parser { input, pos: 0 }.list()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> ExtractError {
        ExtractError::Literal {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn list(mut self) -> Result<Vec<String>> {
        let mut items = Vec::new();
        self.skip_whitespace();
        self.expect('[')?;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(']') {
                self.bump();
                break;
            }
            items.push(self.string()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                Some(c) => return Err(self.error(format!("expected ',' or ']', found '{c}'"))),
                None => return Err(self.error("unterminated list")),
            }
        }
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error("trailing characters after list"));
        }
        Ok(items)
    }

    fn string(&mut self) -> Result<String> {
        let delimiter = match self.bump() {
            Some(c @ ('\'' | '"')) => c,
            Some(c) => return Err(self.error(format!("expected string, found '{c}'"))),
            None => return Err(self.error("expected string, found end of input")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == delimiter => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        match c {
            '\n' => {},
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.code_point(2)?),
            'u' => out.push(self.code_point(4)?),
            'U' => out.push(self.code_point(8)?),
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            self.bump();
                        },
                        None => break,
                    }
                }
                out.push(char::from_u32(value).ok_or_else(|| self.error("invalid octal escape"))?);
            },
            // Unknown escapes keep their backslash
            other => {
                out.push('\\');
                out.push(other);
            },
        }
        Ok(())
    }

    fn code_point(&mut self, digits: usize) -> Result<char> {
        let end = self.pos + digits;
        let hex = self
            .input
            .get(self.pos..end)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.error(format!("expected {digits} hex digits")))?;
        let value = u32::from_str_radix(hex, 16).map_err(|e| self.error(e.to_string()))?;
        let c = char::from_u32(value).ok_or_else(|| self.error("invalid code point"))?;
        self.pos = end;
        Ok(c)
    }
}
