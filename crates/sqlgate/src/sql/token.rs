use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    DmlKeyword,
    DdlKeyword,
    Identifier,
    Punctuation,
    Literal,
    Whitespace,
    Comment,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::DmlKeyword => "dml_keyword",
            Self::DdlKeyword => "ddl_keyword",
            Self::Identifier => "identifier",
            Self::Punctuation => "punctuation",
            Self::Literal => "literal",
            Self::Whitespace => "whitespace",
            Self::Comment => "comment",
        }
    }

    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(self, Self::Keyword | Self::DmlKeyword | Self::DdlKeyword)
    }

    /// Whitespace and comments carry position but no meaning.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub depth: usize,
}

impl Token {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: TokenKind, depth: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            depth,
        }
    }

    /// Case-insensitive keyword test; never matches identifiers or literals.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind.is_keyword() && self.text.eq_ignore_ascii_case(keyword)
    }

    #[must_use]
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.text == punct
    }

    /// Name text with its quoting removed. Doubled quote characters collapse
    /// to one. Single quotes count, since SQLite accepts a string where it
    /// expects a name.
    #[must_use]
    pub fn unquoted(&self) -> String {
        unquote_identifier(&self.text)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[must_use]
pub fn unquote_identifier(text: &str) -> String {
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return text.to_string();
    };

    let inner = &text[first.len_utf8()..text.len() - last.len_utf8()];
    match (first, last) {
        ('"', '"') => inner.replace("\"\"", "\""),
        ('`', '`') => inner.replace("``", "`"),
        ('[', ']') => inner.to_string(),
        ('\'', '\'') => inner.replace("''", "'"),
        _ => text.to_string(),
    }
}
