use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::utils::time::now_utc;

pub const QUERY_ENVELOPE_SCHEMA_VERSION: &str = "sqlgate.query-envelope.v1";

pub type EnvelopeMeta = BTreeMap<String, Value>;

/// A warning or error attached to an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeNotice {
    pub code: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl EnvelopeNotice {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub meta: EnvelopeMeta,
    pub warnings: Vec<EnvelopeNotice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeNotice>,
}

impl QueryEnvelope {
    #[must_use]
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        let mut envelope = Self::base(command, true);
        envelope.data = Some(data);
        envelope
    }

    #[must_use]
    pub fn error(
        command: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut envelope = Self::base(command, false);
        envelope.error = Some(EnvelopeNotice::new(code, message));
        envelope
    }

    /// Error envelope whose code is the stable [`crate::error::ErrorKind::code`].
    #[must_use]
    pub fn from_gateway_error(command: impl Into<String>, error: &GatewayError) -> Self {
        let kind = error.kind();
        Self::error(command, kind.code(), error.to_string())
            .with_error_details(json!({ "validation": kind.is_validation() }))
    }

    fn base(command: impl Into<String>, ok: bool) -> Self {
        let mut meta = EnvelopeMeta::new();
        meta.insert(
            "schema_version".to_string(),
            json!(QUERY_ENVELOPE_SCHEMA_VERSION),
        );

        Self {
            ok,
            command: command.into(),
            generated_at_utc: now_utc(),
            data: None,
            meta,
            warnings: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_warning(
        mut self,
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let mut warning = EnvelopeNotice::new(code, message);
        warning.details = details;
        self.warnings.push(warning);
        self
    }

    #[must_use]
    pub fn with_error_details(mut self, details: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = Some(details);
        }
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A command failed after printing `envelope`. Rejected input exits with
/// the validation code, anything else with the runtime code.
#[derive(Debug, Clone)]
pub struct EnvelopeFailure {
    rejected: bool,
    envelope: QueryEnvelope,
}

impl EnvelopeFailure {
    #[must_use]
    pub fn rejected(envelope: QueryEnvelope) -> Self {
        Self {
            rejected: true,
            envelope,
        }
    }

    #[must_use]
    pub fn failed(envelope: QueryEnvelope) -> Self {
        Self {
            rejected: false,
            envelope,
        }
    }

    #[must_use]
    pub fn from_gateway_error(command: impl Into<String>, error: &GatewayError) -> Self {
        let envelope = QueryEnvelope::from_gateway_error(command, error);
        if error.kind().is_validation() {
            Self::rejected(envelope)
        } else {
            Self::failed(envelope)
        }
    }

    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.rejected
    }

    #[must_use]
    pub fn envelope(&self) -> &QueryEnvelope {
        &self.envelope
    }
}

impl Display for EnvelopeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.envelope.error.as_ref() {
            Some(error) => write!(f, "{}: {}", error.code, error.message),
            None => f.write_str("command failed"),
        }
    }
}

impl std::error::Error for EnvelopeFailure {}
