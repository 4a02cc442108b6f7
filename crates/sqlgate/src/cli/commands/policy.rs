use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::models::QueryEnvelope;
use crate::policy::Policy;

#[derive(Debug, Clone, Args)]
pub struct PolicyArgs {
    /// Print the JSON Schema for policy files instead.
    #[arg(long, default_value_t = false)]
    pub schema: bool,
}

pub fn run(args: &PolicyArgs, config: &GatewayConfig) -> Result<()> {
    let envelope = if args.schema {
        QueryEnvelope::ok("policy", Policy::json_schema())
    } else {
        let policy = serde_json::to_value(&config.policy).context("failed to encode policy")?;
        QueryEnvelope::ok("policy", policy).with_meta(
            "source",
            json!(
                config
                    .policy_path
                    .as_ref()
                    .map_or_else(|| "builtin".to_string(), |path| path.display().to_string())
            ),
        )
    };
    super::emit(&envelope)
}
