//! Line-oriented lexer
//!
//! Blank lines and `#` comments are skipped. Every other line becomes one
//! terminal, matched in order against `Feature:`, `Scenario:`,
//! `Scenario Outline:`, `Examples:` and `|`; anything else is a step.
//! Tokens handed back with [`Lexer::push_back`] are returned before new input.

use crate::token::{ParseToken, TokenType};

const KEYWORDS: [(&str, TokenType); 4] = [
    ("Feature:", TokenType::FeatureStart),
    ("Scenario:", TokenType::ScenarioStart),
    ("Scenario Outline:", TokenType::ScenarioOutlineStart),
    ("Examples:", TokenType::ExamplesStart),
];

/// Token source over feature text
#[derive(Debug)]
pub struct Lexer<'s> {
    lines: std::iter::Enumerate<std::str::Lines<'s>>,
    pushed: Vec<ParseToken>,
    last_line: usize,
}

impl<'s> Lexer<'s> {
    /// Create lexer over feature text
    #[must_use]
    pub fn new(source: &'s str) -> Self {
        Self {
            lines: source.lines().enumerate(),
            pushed: Vec::new(),
            last_line: 0,
        }
    }

    /// Next token; `EndOfFile` forever once input is exhausted
    pub fn next_token(&mut self) -> ParseToken {
        if let Some(token) = self.pushed.pop() {
            return token;
        }
        for (idx, raw) in self.lines.by_ref() {
            let line_no = idx + 1;
            self.last_line = line_no;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return classify(line, line_no);
        }
        ParseToken::new(TokenType::EndOfFile, "", self.last_line + 1)
    }

    /// Return a token so the next call yields it again
    pub fn push_back(&mut self, token: ParseToken) {
        self.pushed.push(token);
    }

    /// Look at the next token without consuming it
    pub fn peek(&mut self) -> &ParseToken {
        let token = self.next_token();
        self.pushed.push(token);
        // just pushed
        &self.pushed[self.pushed.len() - 1]
    }
}

fn classify(line: &str, line_no: usize) -> ParseToken {
    for (keyword, kind) in KEYWORDS {
        if let Some(rest) = line.strip_prefix(keyword) {
            return ParseToken::new(kind, rest.trim(), line_no);
        }
    }
    if line.starts_with('|') {
        return ParseToken::new(TokenType::DataLine, line, line_no);
    }
    ParseToken::new(TokenType::Step, line, line_no)
}
