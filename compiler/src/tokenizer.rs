use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::utils::{error, quote};

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(?s)(/\*.*?\*/|//[^\n]*|"(?:[^"\\\n]|\\.)*"|-?\d+\b|\.?[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*|[=;{}\[\]<>,]|\s+)"#
    )
    .unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^\s+$").unwrap();
}

#[derive(Debug, Error, PartialEq)]
#[error("{msg} at line {line}, column {column}")]
pub struct SyntaxError {
    pub msg:    String,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Integer,
    Str,
    Symbol,
    Comment,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Str && self.kind != TokenKind::Comment && self.text == text
    }
}

fn classify(part: &str) -> TokenKind {
    if part.starts_with("//") || part.starts_with("/*") {
        TokenKind::Comment
    } else if part.starts_with('"') {
        TokenKind::Str
    } else if part.starts_with('-') || part.starts_with(|c: char| c.is_ascii_digit()) {
        TokenKind::Integer
    } else if part.starts_with(|c: char| c == '.' || c == '_' || c.is_ascii_alphabetic()) {
        TokenKind::Ident
    } else {
        TokenKind::Symbol
    }
}

/// Splits schema text into tokens. Whitespace is dropped, comments are kept
/// so the parser can attach them to declarations.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let part = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(error(&format!("Syntax error: {}", quote(unexpected)), line, column));
        }

        if !WHITESPACE_RX.is_match(part) {
            tokens.push(Token {
                kind: classify(part),
                text: part.to_string(),
                line,
                column,
            });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = mat.end();
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(&format!("Syntax error: {}", quote(unexpected)), line, column));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
        column,
    });
    Ok(tokens)
}
