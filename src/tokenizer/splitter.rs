//! Marker/text splitter
//!
//! Splits raw WEB input into a lazy stream of tokens by applying the pattern
//! `@.|\n` (with the command character escaped and configurable). Matches
//! become `Command` or `Newline` tokens; the fragments between matches become
//! `Text` tokens. Because newlines are themselves matches, a text run never
//! spans a line boundary, which keeps column tracking trivial.
//!
//! The splitter does not interpret markers. `@@` is surfaced as an ordinary
//! `Command` token; unknown markers pass through untouched. Classifying or
//! rejecting them is the reader's job.

use regex::Regex;

use super::tokens::{Token, TokenKind};

/// Lazy, finite, non-restartable token stream over a single input text.
pub struct Splitter<'a> {
    input: &'a str,
    marker_re: Regex,
    pos: usize,
    line: usize,
    column: usize,
    pending: Option<Token>,
}

impl<'a> Splitter<'a> {
    pub fn new(input: &'a str, command_char: char) -> Self {
        // `.` intentionally excludes `\n`: a lone command character at end of
        // line falls through to the text run instead of consuming the newline.
        let pattern = format!("{}.|\n", regex::escape(&command_char.to_string()));
        Self {
            input,
            marker_re: Regex::new(&pattern).expect("invalid marker pattern"),
            pos: 0,
            line: 1,
            column: 0,
            pending: None,
        }
    }

    fn text_token(&mut self, start: usize, end: usize) -> Token {
        let value = &self.input[start..end];
        let token = Token::new(
            TokenKind::Text,
            value.to_string(),
            self.line,
            self.column,
        );
        self.column += value.chars().count();
        token
    }

    fn marker_token(&mut self, value: &str) -> Token {
        if value == "\n" {
            let token = Token::new(TokenKind::Newline, value.to_string(), self.line, self.column);
            self.line += 1;
            self.column = 0;
            token
        } else {
            let token = Token::new(TokenKind::Command, value.to_string(), self.line, self.column);
            self.column += 2;
            token
        }
    }
}

impl<'a> Iterator for Splitter<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        if self.pos >= self.input.len() {
            return None;
        }
        match self.marker_re.find_at(self.input, self.pos) {
            Some(m) => {
                let text = if m.start() > self.pos {
                    Some(self.text_token(self.pos, m.start()))
                } else {
                    None
                };
                let marker = self.marker_token(m.as_str());
                self.pos = m.end();
                match text {
                    Some(token) => {
                        self.pending = Some(marker);
                        Some(token)
                    }
                    None => Some(marker),
                }
            }
            None => {
                // Trailing text after the last marker, including a dangling
                // lone command character at end of input.
                let token = self.text_token(self.pos, self.input.len());
                self.pos = self.input.len();
                Some(token)
            }
        }
    }
}
