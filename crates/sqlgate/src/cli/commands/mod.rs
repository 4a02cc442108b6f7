pub mod check;
pub mod mapping;
pub mod policy;
pub mod query;
pub mod resolve;
pub mod tag;

use anyhow::{Context, Error, Result};

use crate::config::GatewayConfig;
use crate::engine::ReadOnlyEngine;
use crate::gateway::Gateway;
use crate::models::{EnvelopeFailure, QueryEnvelope};
use crate::resolver::{ProjectResolver, SqliteMappingSource};

/// Prints `envelope` as one JSON document on stdout.
pub fn emit(envelope: &QueryEnvelope) -> Result<()> {
    let encoded = serde_json::to_string(envelope).context("failed to encode response envelope")?;
    println!("{encoded}");
    Ok(())
}

/// Prints the failure's envelope, then hands it back for exit-code mapping.
pub fn emit_failure(failure: EnvelopeFailure) -> Error {
    match emit(failure.envelope()) {
        Ok(()) => Error::new(failure),
        Err(error) => error,
    }
}

pub(crate) fn gateway(config: &GatewayConfig) -> Gateway {
    Gateway::new(config.policy.clone(), ReadOnlyEngine::new(&config.db_path))
}

pub(crate) fn resolver(config: &GatewayConfig) -> ProjectResolver<SqliteMappingSource> {
    let source = SqliteMappingSource::new(ReadOnlyEngine::new(&config.db_path));
    ProjectResolver::new(source, config.cache_ttl)
}

/// Adds cache counters and a warning when the last reload failed.
pub(crate) fn with_cache_meta(
    envelope: QueryEnvelope,
    resolver: &ProjectResolver<SqliteMappingSource>,
) -> QueryEnvelope {
    let stats = resolver.stats();
    let envelope = envelope.with_meta("cache", serde_json::json!(stats));
    if stats.reload_failures == 0 {
        return envelope;
    }
    envelope.with_warning(
        "mapping_unavailable",
        "project mapping could not be loaded; results may be empty",
        Some(serde_json::json!({ "reload_failures": stats.reload_failures })),
    )
}
