use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::models::QueryEnvelope;

#[derive(Debug, Clone, Args)]
pub struct TagArgs {
    /// Project code, with or without brackets (`[LR166]` or `LR166`).
    #[arg(value_name = "CODE")]
    pub code: String,
}

pub fn run(args: &TagArgs, config: &GatewayConfig) -> Result<()> {
    let resolver = super::resolver(config);
    let tag = resolver.display_name(&args.code);

    let envelope = QueryEnvelope::ok("tag", json!({ "code": args.code, "tag": tag }));
    super::emit(&super::with_cache_meta(envelope, &resolver))
}
