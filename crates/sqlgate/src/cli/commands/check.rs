use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::models::{EnvelopeFailure, QueryEnvelope};

const COMMAND: &str = "check";

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,
}

pub fn run(args: &CheckArgs, config: &GatewayConfig) -> Result<()> {
    let gateway = super::gateway(config);
    let query = gateway
        .validate_and_prepare(&args.sql)
        .map_err(|error| {
            super::emit_failure(EnvelopeFailure::from_gateway_error(COMMAND, &error))
        })?;

    let envelope = QueryEnvelope::ok(
        COMMAND,
        json!({
            "canonical_sql": query.sql(),
            "referenced_tables": query.referenced_tables(),
        }),
    );
    super::emit(&envelope)
}
