//! Properties text codec
//!
//! Reads and writes the flat `key=value` format used by every store. The
//! reader accepts the full line syntax: `=`, `:` or whitespace separators,
//! `#`/`!` comments, backslash line continuation and the `\t \n \r \f \uXXXX`
//! escapes. The writer emits one entry per line, sorted by key.

use crate::error::PropertiesError;
use std::collections::BTreeMap;

/// Parse properties text into a sorted map
///
/// Later duplicates of a key replace earlier ones.
///
/// # Errors
/// Returns [`PropertiesError`] for a malformed `\u` escape.
pub fn parse(input: &str) -> Result<BTreeMap<String, String>, PropertiesError> {
    let mut map = BTreeMap::new();
    for (line_no, logical) in logical_lines(input) {
        let (raw_key, raw_value) = split_entry(&logical);
        let key = unescape(raw_key, line_no)?;
        let value = unescape(raw_value, line_no)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Render a map as properties text
#[must_use]
pub fn render(map: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }
    out
}

/// Join natural lines into logical lines, dropping comments and blanks.
///
/// Yields the 1-based line number each logical line started on.
fn logical_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (idx, natural) in input.lines().enumerate() {
        let natural = natural.strip_suffix('\r').unwrap_or(natural);
        let trimmed = natural.trim_start_matches([' ', '\t', '\x0c']);

        let (start, mut buf) = match current.take() {
            Some(pending) => pending,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                (idx + 1, String::new())
            }
        };

        let trailing = trimmed.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            buf.push_str(&trimmed[..trimmed.len() - 1]);
            current = Some((start, buf));
        } else {
            buf.push_str(trimmed);
            lines.push((start, buf));
        }
    }

    if let Some(pending) = current {
        lines.push(pending);
    }
    lines
}

/// Split a logical line into raw (still escaped) key and value
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut split = None;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                split = Some((idx, ch));
                break;
            }
            _ => {}
        }
    }

    let Some((idx, sep)) = split else {
        return (line, "");
    };

    let key = &line[..idx];
    let mut rest = &line[idx + sep.len_utf8()..];
    rest = rest.trim_start_matches([' ', '\t', '\x0c']);
    if matches!(sep, ' ' | '\t' | '\x0c') {
        if let Some(stripped) = rest.strip_prefix(['=', ':']) {
            rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
        }
    }
    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let high = read_hex4(&mut chars, line)?;
                let decoded = if (0xD800..0xDC00).contains(&high) {
                    let low = match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => read_hex4(&mut chars, line)?,
                        _ => return Err(PropertiesError::new(line, "unpaired surrogate escape")),
                    };
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(PropertiesError::new(line, "unpaired surrogate escape"));
                    }
                    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    high
                };
                let decoded = char::from_u32(decoded)
                    .ok_or_else(|| PropertiesError::new(line, "invalid \\u escape"))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u32, PropertiesError> {
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| PropertiesError::new(line, "malformed \\uXXXX escape"))?;
        value = value * 16 + digit;
    }
    Ok(value)
}

fn escape_into(out: &mut String, text: &str, is_key: bool) {
    for (idx, ch) in text.chars().enumerate() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(ch);
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
}
