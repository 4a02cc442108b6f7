use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::models::QueryEnvelope;
use crate::resolver::DEFAULT_MAPPING_CONTEXT_ITEMS;

#[derive(Debug, Clone, Args)]
pub struct MappingArgs {
    #[arg(long, default_value_t = DEFAULT_MAPPING_CONTEXT_ITEMS)]
    pub max_items: usize,
}

pub fn run(args: &MappingArgs, config: &GatewayConfig) -> Result<()> {
    let resolver = super::resolver(config);
    let mapping = resolver.get_mapping();
    let context = mapping.context_lines(args.max_items);

    let envelope = QueryEnvelope::ok(
        "mapping",
        json!({
            "context": context,
            "codes": mapping.code_count(),
            "keys": mapping.key_count(),
        }),
    )
    .with_meta("max_items", json!(args.max_items));
    super::emit(&super::with_cache_meta(envelope, &resolver))
}
