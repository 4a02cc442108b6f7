use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::engine::parse_params;
use crate::models::{EnvelopeFailure, QueryEnvelope};

const COMMAND: &str = "query";

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// Positional parameters as a JSON scalar or array.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,

    #[arg(long, default_value_t = 1_000)]
    pub row_cap: usize,
}

pub fn run(args: &QueryArgs, config: &GatewayConfig) -> Result<()> {
    let gateway = super::gateway(config);
    let query = gateway
        .validate_and_prepare(&args.sql)
        .map_err(|error| {
            super::emit_failure(EnvelopeFailure::from_gateway_error(COMMAND, &error))
        })?;

    if args.row_cap == 0 {
        return Err(super::emit_failure(EnvelopeFailure::rejected(
            QueryEnvelope::error(COMMAND, "row_cap_invalid", "row_cap must be greater than zero")
                .with_error_details(json!({ "row_cap": args.row_cap })),
        )));
    }

    let params = parse_params(args.params.as_deref()).map_err(|error| {
        super::emit_failure(EnvelopeFailure::rejected(
            QueryEnvelope::error(COMMAND, "params_invalid", "invalid query params")
                .with_error_details(json!({ "cause": format!("{error:#}") })),
        ))
    })?;

    let started = Instant::now();
    let output = gateway
        .execute_capped(&query, &params, Some(args.row_cap))
        .map_err(|error| {
            super::emit_failure(EnvelopeFailure::from_gateway_error(COMMAND, &error))
        })?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut envelope = QueryEnvelope::ok(
        COMMAND,
        json!({
            "canonical_sql": query.sql(),
            "columns": output.column_names,
            "rows": output.rows,
        }),
    )
    .with_meta("row_count", json!(output.row_count()))
    .with_meta("truncated", json!(output.truncated))
    .with_meta("row_cap", json!(args.row_cap))
    .with_meta("params_count", json!(params.len()))
    .with_meta("duration_ms", json!(duration_ms));
    if output.truncated {
        envelope = envelope.with_warning(
            "result_truncated",
            "result truncated to row_cap",
            Some(json!({ "row_cap": args.row_cap })),
        );
    }
    super::emit(&envelope)
}
