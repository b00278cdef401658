//! Turns expression text into tokens.
//!
//! Signs are never part of a number literal; `-` is always its own token and
//! the parser decides between negation and subtraction.

use super::ast::Comparison;
use super::token::{Token, TokenKind};
use crate::error::LexError;

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn error(&self, offset: usize) -> LexError {
        LexError {
            found: self.chars[offset],
            offset,
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let mut seen_point = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' && !seen_point {
                seen_point = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        // A lone "." has no digits.
        let value = text.parse::<f64>().map_err(|_| self.error(start))?;
        Ok(Token::new(TokenKind::Number(value), start))
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let kind = match word.as_str() {
            "x" | "X" => TokenKind::Variable,
            _ => TokenKind::Identifier(word),
        };
        Token::new(kind, start)
    }

    /// `<`, `<=`, `>`, `>=` or `!=`.
    fn read_comparison(&mut self, first: char) -> Result<Token, LexError> {
        let start = self.pos;
        let followed_by_eq = self.peek_next() == Some('=');
        let op = match (first, followed_by_eq) {
            ('<', false) => Comparison::Less,
            ('<', true) => Comparison::LessOrEqual,
            ('>', false) => Comparison::Greater,
            ('>', true) => Comparison::GreaterOrEqual,
            ('!', true) => Comparison::NotEqual,
            _ => return Err(self.error(start)),
        };
        self.pos += if followed_by_eq { 2 } else { 1 };
        Ok(Token::new(TokenKind::Comparison(op), start))
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }

        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::End, self.pos));
        };

        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ',' => Some(TokenKind::Comma),
            '|' => Some(TokenKind::Pipe),
            _ => None,
        };
        if let Some(kind) = single {
            let token = Token::new(kind, self.pos);
            self.pos += 1;
            return Ok(token);
        }

        match c {
            '0'..='9' | '.' => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_word()),
            '<' | '>' | '!' => self.read_comparison(c),
            _ => Err(self.error(self.pos)),
        }
    }
}

/// Tokenizes `input`. The returned sequence always ends with
/// [`TokenKind::End`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::End;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
