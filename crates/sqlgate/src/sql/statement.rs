use std::collections::BTreeSet;

use super::lexer::{LexError, tokenize, tokenize_lenient};
use super::tables::extract_tables;
use super::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Other,
}

impl StatementKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Other => "other",
        }
    }
}

/// One top-level statement and everything derived from its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub raw_text: String,
    pub tokens: Vec<Token>,
    pub kind: StatementKind,
    pub referenced_tables: BTreeSet<String>,
}

impl Statement {
    pub fn parse(raw_text: &str) -> Result<Self, LexError> {
        let tokens = tokenize(raw_text)?;
        let kind = classify(&tokens);
        let referenced_tables = extract_tables(&tokens);
        Ok(Self {
            raw_text: raw_text.to_string(),
            tokens,
            kind,
            referenced_tables,
        })
    }

    /// The statement text without surrounding whitespace.
    #[must_use]
    pub fn canonical_sql(&self) -> &str {
        self.raw_text.trim()
    }

    #[must_use]
    pub fn leading_keyword(&self) -> Option<&str> {
        first_significant(&self.tokens).map(|token| token.text.as_str())
    }
}

/// Splits on semicolons at depth zero that are not inside a literal,
/// identifier or comment. Fragments holding only whitespace and comments
/// are dropped; the terminators themselves are not part of any fragment.
#[must_use]
pub fn split(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_content = false;

    for token in tokenize_lenient(text) {
        if token.depth == 0 && token.is_punct(";") {
            if has_content {
                statements.push(std::mem::take(&mut current));
            }
            current.clear();
            has_content = false;
            continue;
        }
        has_content |= !token.kind.is_trivia();
        current.push_str(&token.text);
    }

    if has_content {
        statements.push(current);
    }
    statements
}

#[must_use]
pub fn classify(tokens: &[Token]) -> StatementKind {
    match first_significant(tokens) {
        Some(token) if token.is_keyword("SELECT") => StatementKind::Select,
        _ => StatementKind::Other,
    }
}

pub(crate) fn first_significant(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().find(|token| !token.kind.is_trivia())
}
