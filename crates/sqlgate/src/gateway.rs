use std::collections::BTreeSet;

use rusqlite::types::Value as SqlValue;

use crate::engine::{QueryOutput, ReadOnlyEngine, Row};
use crate::error::GatewayError;
use crate::policy::Policy;

/// SQL that passed the policy. Only [`Gateway::validate_and_prepare`]
/// constructs one, so execution cannot skip validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    canonical_sql: String,
    referenced_tables: BTreeSet<String>,
}

impl PreparedQuery {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.canonical_sql
    }

    /// Every table the statement reads, as checked against the allow-list.
    #[must_use]
    pub fn referenced_tables(&self) -> &BTreeSet<String> {
        &self.referenced_tables
    }

    #[must_use]
    pub fn into_sql(self) -> String {
        self.canonical_sql
    }
}

#[derive(Debug, Clone)]
pub struct Gateway {
    policy: Policy,
    engine: ReadOnlyEngine,
}

impl Gateway {
    #[must_use]
    pub fn new(policy: Policy, engine: ReadOnlyEngine) -> Self {
        Self { policy, engine }
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn engine(&self) -> &ReadOnlyEngine {
        &self.engine
    }

    pub fn validate_and_prepare(&self, raw_sql: &str) -> Result<PreparedQuery, GatewayError> {
        match self.policy.validate_statement(raw_sql) {
            Ok(statement) => Ok(PreparedQuery {
                canonical_sql: statement.canonical_sql().to_string(),
                referenced_tables: statement.referenced_tables,
            }),
            Err(reason) => {
                tracing::info!(reason = reason.kind().code(), %reason, "query rejected");
                Err(reason.into())
            }
        }
    }

    pub fn execute(
        &self,
        query: &PreparedQuery,
        params: &[SqlValue],
    ) -> Result<Vec<Row>, GatewayError> {
        self.engine.execute(query.sql(), params)
    }

    pub fn execute_capped(
        &self,
        query: &PreparedQuery,
        params: &[SqlValue],
        row_cap: Option<usize>,
    ) -> Result<QueryOutput, GatewayError> {
        self.engine.execute_capped(query.sql(), params, row_cap)
    }

    /// Validates then executes; storage is never touched for rejected SQL.
    pub fn run(&self, raw_sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, GatewayError> {
        let query = self.validate_and_prepare(raw_sql)?;
        self.execute(&query, params)
    }
}
