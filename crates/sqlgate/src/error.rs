use std::path::PathBuf;

use thiserror::Error;

use crate::sql::LexError;

/// Why the policy refused a query. None of these touch storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("SQL query is empty")]
    EmptyInput,

    #[error("SQL query is malformed: {0}")]
    MalformedInput(#[from] LexError),

    #[error("exactly one statement is allowed, found {count}")]
    MultipleStatements { count: usize },

    #[error("keyword `{0}` is not allowed")]
    ForbiddenKeyword(String),

    #[error("only SELECT statements are allowed, statement starts with `{leading}`")]
    NotASelect { leading: String },

    #[error("table `{0}` is not allowed")]
    TableNotAllowed(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("query rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("query failed to run: {0}")]
    StorageExecution(String),

    #[error("unable to open database {path} read-only: {message}")]
    StorageUnavailable { path: PathBuf, message: String },
}

/// Flat discriminant for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyInput,
    MalformedInput,
    MultipleStatements,
    ForbiddenKeyword,
    NotASelect,
    TableNotAllowed,
    StorageExecution,
    StorageUnavailable,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::MalformedInput => "malformed_input",
            Self::MultipleStatements => "multiple_statements",
            Self::ForbiddenKeyword => "forbidden_keyword",
            Self::NotASelect => "not_a_select",
            Self::TableNotAllowed => "table_not_allowed",
            Self::StorageExecution => "storage_execution_error",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }

    #[must_use]
    pub const fn is_validation(self) -> bool {
        !matches!(self, Self::StorageExecution | Self::StorageUnavailable)
    }
}

impl ValidationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::MultipleStatements { .. } => ErrorKind::MultipleStatements,
            Self::ForbiddenKeyword(_) => ErrorKind::ForbiddenKeyword,
            Self::NotASelect { .. } => ErrorKind::NotASelect,
            Self::TableNotAllowed(_) => ErrorKind::TableNotAllowed,
        }
    }
}

impl GatewayError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(error) => error.kind(),
            Self::StorageExecution(_) => ErrorKind::StorageExecution,
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
        }
    }

    pub(crate) fn storage(error: &rusqlite::Error) -> Self {
        Self::StorageExecution(error.to_string())
    }
}
