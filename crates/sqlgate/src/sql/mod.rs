pub mod lexer;
pub mod statement;
pub mod tables;
pub mod token;

use std::collections::BTreeSet;

pub use lexer::{LexError, tokenize};
pub use statement::{Statement, StatementKind, classify, split};
pub use tables::extract_tables;
pub use token::{Token, TokenKind};

/// The lexing capability the policy validator depends on. Only `tokenize`
/// and `split` are lexer specific; classification and table extraction
/// work on any conforming token stream.
pub trait SqlTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, LexError>;

    fn split(&self, text: &str) -> Vec<String>;

    fn classify(&self, tokens: &[Token]) -> StatementKind {
        classify(tokens)
    }

    fn extract_tables(&self, tokens: &[Token]) -> BTreeSet<String> {
        extract_tables(tokens)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTokenizer;

impl SqlTokenizer for SqliteTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, LexError> {
        lexer::tokenize(text)
    }

    fn split(&self, text: &str) -> Vec<String> {
        statement::split(text)
    }
}
