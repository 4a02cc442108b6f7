//! Query policy: which keywords are refused outright and which tables a
//! statement may read.
//!
//! [`Policy::validate`] runs the checks in a fixed order and stops at the
//! first failure: emptiness, statement count, lexing, denylisted keywords
//! (at any depth), the SELECT-only rule and finally the table allow-list.
//! Only keyword tokens are checked against the denylist, so a forbidden word
//! inside a string literal, quoted identifier or comment is harmless.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::sql::lexer::keyword_kind;
use crate::sql::{SqlTokenizer, SqliteTokenizer, Statement, StatementKind};

pub const DEFAULT_FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "REPLACE", "UPSERT", "MERGE", "TRUNCATE", "DROP", "ALTER",
    "CREATE", "RENAME", "ATTACH", "DETACH", "REINDEX", "VACUUM", "ANALYZE", "PRAGMA", "BEGIN",
    "COMMIT", "ROLLBACK", "SAVEPOINT", "RELEASE",
];

pub const DEFAULT_ALLOWED_TABLES: &[&str] = &["leads"];

pub const DEFAULT_MAX_STATEMENTS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    forbidden_keywords: BTreeSet<String>,
    allowed_tables: BTreeSet<String>,
    max_statements: usize,
}

/// On-disk policy shape. Omitted fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tables: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted(String),
    Rejected(ValidationError),
}

impl ValidationVerdict {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn into_result(self) -> std::result::Result<String, ValidationError> {
        match self {
            Self::Accepted(canonical_sql) => Ok(canonical_sql),
            Self::Rejected(reason) => Err(reason),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(
            DEFAULT_FORBIDDEN_KEYWORDS.iter().copied(),
            DEFAULT_ALLOWED_TABLES.iter().copied(),
        )
    }
}

impl TryFrom<PolicyFile> for Policy {
    type Error = anyhow::Error;

    /// Fails on denylist entries the lexer never reports as keywords, since
    /// those could never reject anything.
    fn try_from(file: PolicyFile) -> Result<Self> {
        let defaults = Self::default();
        let forbidden_keywords = match file.forbidden_keywords {
            Some(keywords) => keywords
                .iter()
                .map(|keyword| normalize_keyword(keyword))
                .collect::<BTreeSet<_>>(),
            None => defaults.forbidden_keywords,
        };
        let unmatchable = forbidden_keywords
            .iter()
            .filter(|keyword| keyword_kind(keyword).is_none())
            .map(String::as_str)
            .collect::<Vec<_>>();
        if !unmatchable.is_empty() {
            bail!(
                "forbidden_keywords entries are not SQL keywords and can never match: {}",
                unmatchable.join(", ")
            );
        }

        let allowed_tables = match file.allowed_tables {
            Some(tables) => tables.iter().map(|table| normalize_table(table)).collect(),
            None => defaults.allowed_tables,
        };

        Ok(Self {
            forbidden_keywords,
            allowed_tables,
            max_statements: DEFAULT_MAX_STATEMENTS,
        })
    }
}

impl Policy {
    pub fn new<K, T>(forbidden_keywords: K, allowed_tables: T) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        Self {
            forbidden_keywords: forbidden_keywords
                .into_iter()
                .map(|keyword| normalize_keyword(keyword.as_ref()))
                .collect(),
            allowed_tables: allowed_tables
                .into_iter()
                .map(|table| normalize_table(table.as_ref()))
                .collect(),
            max_statements: DEFAULT_MAX_STATEMENTS,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file: {}", path.display()))?;
        let file = serde_json::from_str::<PolicyFile>(&raw)
            .with_context(|| format!("failed to parse policy file: {}", path.display()))?;
        Self::try_from(file)
            .with_context(|| format!("invalid policy file: {}", path.display()))
    }

    #[must_use]
    pub fn forbidden_keywords(&self) -> &BTreeSet<String> {
        &self.forbidden_keywords
    }

    #[must_use]
    pub fn allowed_tables(&self) -> &BTreeSet<String> {
        &self.allowed_tables
    }

    #[must_use]
    pub fn max_statements(&self) -> usize {
        self.max_statements
    }

    #[must_use]
    pub fn forbids(&self, keyword: &str) -> bool {
        self.forbidden_keywords.contains(&normalize_keyword(keyword))
    }

    #[must_use]
    pub fn allows_table(&self, table: &str) -> bool {
        self.allowed_tables.contains(&normalize_table(table))
    }

    #[must_use]
    pub fn validate(&self, raw_sql: &str) -> ValidationVerdict {
        self.validate_with(&SqliteTokenizer, raw_sql)
    }

    #[must_use]
    pub fn validate_with(
        &self,
        tokenizer: &impl SqlTokenizer,
        raw_sql: &str,
    ) -> ValidationVerdict {
        match self.check(tokenizer, raw_sql) {
            Ok(statement) => ValidationVerdict::Accepted(statement.canonical_sql().to_string()),
            Err(reason) => ValidationVerdict::Rejected(reason),
        }
    }

    /// Like [`Policy::validate`], but hands back the accepted statement with
    /// its tokens and referenced tables.
    pub fn validate_statement(
        &self,
        raw_sql: &str,
    ) -> std::result::Result<Statement, ValidationError> {
        self.check(&SqliteTokenizer, raw_sql)
    }

    fn check(
        &self,
        tokenizer: &impl SqlTokenizer,
        raw_sql: &str,
    ) -> std::result::Result<Statement, ValidationError> {
        if raw_sql.trim().is_empty() {
            return Err(ValidationError::EmptyInput);
        }

        let fragments = tokenizer.split(raw_sql);
        if fragments.len() > self.max_statements {
            return Err(ValidationError::MultipleStatements {
                count: fragments.len(),
            });
        }
        let Some(raw_statement) = fragments.first() else {
            return Err(ValidationError::EmptyInput);
        };

        let tokens = tokenizer.tokenize(raw_statement)?;

        if let Some(keyword) = tokens
            .iter()
            .find(|token| token.kind.is_keyword() && self.forbids(&token.text))
        {
            return Err(ValidationError::ForbiddenKeyword(normalize_keyword(&keyword.text)));
        }

        let statement = Statement {
            raw_text: raw_statement.clone(),
            kind: tokenizer.classify(&tokens),
            referenced_tables: tokenizer.extract_tables(&tokens),
            tokens,
        };

        if statement.kind != StatementKind::Select {
            return Err(ValidationError::NotASelect {
                leading: statement
                    .leading_keyword()
                    .unwrap_or("unknown")
                    .to_ascii_uppercase(),
            });
        }

        if let Some(table) = statement
            .referenced_tables
            .iter()
            .find(|table| !self.allows_table(table))
        {
            return Err(ValidationError::TableNotAllowed(table.clone()));
        }

        Ok(statement)
    }

    #[must_use]
    pub fn json_schema() -> Value {
        let schema = schemars::schema_for!(PolicyFile);
        match serde_json::to_value(schema) {
            Ok(value) => value,
            Err(error) => {
                panic!("failed to serialize generated policy schema: {error}");
            }
        }
    }
}

/// Validates `raw_sql` against `policy` with the built-in SQLite tokenizer.
#[must_use]
pub fn validate(raw_sql: &str, policy: &Policy) -> ValidationVerdict {
    policy.validate(raw_sql)
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_ascii_uppercase()
}

fn normalize_table(table: &str) -> String {
    crate::sql::token::unquote_identifier(table.trim()).to_lowercase()
}
