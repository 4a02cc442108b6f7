//! SQLite-flavoured lexer producing a flat, classified token stream.
//!
//! Every token records the parenthesis depth it was read at, so callers can
//! scan sub-selects together with the outer statement while still telling
//! top-level punctuation apart. Whitespace and comments are kept as tokens.

use thiserror::Error;

use super::token::{Token, TokenKind};

const DML_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "REPLACE", "UPSERT", "MERGE",
];

const DDL_KEYWORDS: &[&str] = &["CREATE", "ALTER", "DROP", "TRUNCATE", "RENAME"];

const KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ANALYZE", "AND", "AS", "ASC", "ATTACH",
    "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST", "CHECK",
    "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CROSS", "CURRENT",
    "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT", "DEFERRABLE",
    "DEFERRED", "DESC", "DETACH", "DISTINCT", "DO", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT",
    "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL", "FALSE", "FILTER", "FIRST",
    "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB", "GROUP", "GROUPS",
    "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED", "INITIALLY", "INNER",
    "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "LAST", "LEFT", "LIKE", "LIMIT",
    "MATCH", "MATERIALIZED", "NATURAL", "NOT", "NOTHING", "NOTNULL", "NULL", "NULLS", "OF",
    "OFFSET", "ON", "OR", "ORDER", "OTHERS", "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA",
    "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE", "RECURSIVE", "REFERENCES", "REGEXP",
    "REINDEX", "RELEASE", "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS",
    "SAVEPOINT", "SET", "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION",
    "TRIGGER", "TRUE", "UNBOUNDED", "UNION", "UNIQUE", "USING", "VACUUM", "VALUES", "VIEW",
    "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// Keywords that SQLite also exposes as scalar functions. Followed by `(`
/// they are a call, not a clause.
const KEYWORD_FUNCTIONS: &[&str] = &["REPLACE", "GLOB", "LIKE", "MATCH", "REGEXP"];

const MULTI_CHAR_OPERATORS: &[&str] = &[
    "->>", "->", "<=", ">=", "<>", "!=", "==", "||", "<<", ">>",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated {what} starting at character {position}")]
    Unterminated { what: &'static str, position: usize },

    #[error("unbalanced `)` at character {position}")]
    UnbalancedClose { position: usize },

    #[error("{open} unclosed `(` at end of input")]
    UnclosedParen { open: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexMode {
    Strict,
    /// Unterminated constructs run to end of input and stray `)` are
    /// tolerated. Used by the splitter so it never fails.
    Lenient,
}

/// Strict tokenization: malformed quoting or nesting is an error.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(text, LexMode::Strict).run()
}

pub(crate) fn tokenize_lenient(text: &str) -> Vec<Token> {
    // Lenient mode has no failure path.
    Lexer::new(text, LexMode::Lenient)
        .run()
        .unwrap_or_default()
}

#[must_use]
pub fn keyword_kind(upper: &str) -> Option<TokenKind> {
    if DML_KEYWORDS.contains(&upper) {
        Some(TokenKind::DmlKeyword)
    } else if DDL_KEYWORDS.contains(&upper) {
        Some(TokenKind::DdlKeyword)
    } else if KEYWORDS.contains(&upper) {
        Some(TokenKind::Keyword)
    } else {
        None
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    mode: LexMode,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(text: &str, mode: LexMode) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
            mode,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(c) = self.peek(0) {
            let start = self.pos;

            if c.is_whitespace() {
                self.take_while(char::is_whitespace);
                self.push(start, TokenKind::Whitespace);
            } else if c == '-' && self.peek(1) == Some('-') {
                self.take_while(|ch| ch != '\n');
                self.push(start, TokenKind::Comment);
            } else if c == '/' && self.peek(1) == Some('*') {
                self.lex_block_comment(start)?;
            } else if c == '\'' {
                self.lex_quoted(start, '\'', "string literal", TokenKind::Literal)?;
            } else if (c == 'x' || c == 'X') && self.peek(1) == Some('\'') {
                self.pos += 1;
                self.lex_quoted(start, '\'', "blob literal", TokenKind::Literal)?;
            } else if c == '"' {
                self.lex_quoted(start, '"', "quoted identifier", TokenKind::Identifier)?;
            } else if c == '`' {
                self.lex_quoted(start, '`', "quoted identifier", TokenKind::Identifier)?;
            } else if c == '[' {
                self.lex_bracketed(start)?;
            } else if c == '(' {
                self.pos += 1;
                self.push(start, TokenKind::Punctuation);
                self.depth += 1;
            } else if c == ')' {
                self.lex_close_paren(start)?;
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek(1).is_some_and(|next| next.is_ascii_digit()))
            {
                self.lex_number(start);
            } else if c == '?' {
                self.pos += 1;
                self.take_while(|ch| ch.is_ascii_digit());
                self.push(start, TokenKind::Literal);
            } else if matches!(c, ':' | '@' | '$') && self.peek(1).is_some_and(is_word_char) {
                self.pos += 1;
                self.take_while(is_word_char);
                self.push(start, TokenKind::Literal);
            } else if is_word_start(c) {
                self.lex_word(start);
            } else {
                self.lex_operator(start);
            }
        }

        if self.mode == LexMode::Strict && self.depth > 0 {
            return Err(LexError::UnclosedParen { open: self.depth });
        }

        Ok(self.tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&predicate) {
            self.pos += 1;
        }
    }

    fn push(&mut self, start: usize, kind: TokenKind) {
        let text = self.chars[start..self.pos].iter().collect::<String>();
        self.tokens.push(Token::new(text, kind, self.depth));
    }

    fn unterminated(
        &mut self,
        start: usize,
        what: &'static str,
        kind: TokenKind,
    ) -> Result<(), LexError> {
        match self.mode {
            LexMode::Strict => Err(LexError::Unterminated {
                what,
                position: start,
            }),
            LexMode::Lenient => {
                self.pos = self.chars.len();
                self.push(start, kind);
                Ok(())
            }
        }
    }

    fn lex_block_comment(&mut self, start: usize) -> Result<(), LexError> {
        self.pos += 2;
        while let Some(c) = self.peek(0) {
            if c == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                self.push(start, TokenKind::Comment);
                return Ok(());
            }
            self.pos += 1;
        }
        self.unterminated(start, "block comment", TokenKind::Comment)
    }

    /// Quote characters are escaped by doubling them.
    fn lex_quoted(
        &mut self,
        start: usize,
        quote: char,
        what: &'static str,
        kind: TokenKind,
    ) -> Result<(), LexError> {
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            if c == quote {
                if self.peek(1) == Some(quote) {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                self.push(start, kind);
                return Ok(());
            }
            self.pos += 1;
        }
        self.unterminated(start, what, kind)
    }

    fn lex_bracketed(&mut self, start: usize) -> Result<(), LexError> {
        self.pos += 1;
        self.take_while(|ch| ch != ']');
        if self.peek(0) == Some(']') {
            self.pos += 1;
            self.push(start, TokenKind::Identifier);
            return Ok(());
        }
        self.unterminated(start, "bracketed identifier", TokenKind::Identifier)
    }

    fn lex_close_paren(&mut self, start: usize) -> Result<(), LexError> {
        if self.depth == 0 {
            if self.mode == LexMode::Strict {
                return Err(LexError::UnbalancedClose { position: start });
            }
        } else {
            self.depth -= 1;
        }
        self.pos += 1;
        self.push(start, TokenKind::Punctuation);
        Ok(())
    }

    fn lex_number(&mut self, start: usize) {
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X')) {
            self.pos += 2;
            self.take_while(|ch| ch.is_ascii_hexdigit());
        } else {
            self.take_while(|ch| ch.is_ascii_digit() || ch == '.');
            if matches!(self.peek(0), Some('e' | 'E')) {
                let sign = usize::from(matches!(self.peek(1), Some('+' | '-')));
                if self.peek(1 + sign).is_some_and(|ch| ch.is_ascii_digit()) {
                    self.pos += 1 + sign;
                    self.take_while(|ch| ch.is_ascii_digit());
                }
            }
        }
        self.push(start, TokenKind::Literal);
    }

    fn lex_word(&mut self, start: usize) {
        self.take_while(is_word_char);
        let upper = self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_uppercase();

        let is_call = KEYWORD_FUNCTIONS.contains(&upper.as_str())
            && self.next_significant_char() == Some('(');
        let kind = if is_call {
            TokenKind::Identifier
        } else {
            keyword_kind(&upper).unwrap_or(TokenKind::Identifier)
        };
        self.push(start, kind);
    }

    fn next_significant_char(&self) -> Option<char> {
        self.chars[self.pos..]
            .iter()
            .copied()
            .find(|ch| !ch.is_whitespace())
    }

    fn lex_operator(&mut self, start: usize) {
        let width = MULTI_CHAR_OPERATORS
            .iter()
            .find(|op| {
                op.chars()
                    .enumerate()
                    .all(|(offset, ch)| self.peek(offset) == Some(ch))
            })
            .map_or(1, |op| op.chars().count());
        self.pos += width;
        self.push(start, TokenKind::Punctuation);
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
