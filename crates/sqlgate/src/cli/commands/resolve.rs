use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::models::QueryEnvelope;

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    #[arg(value_name = "TEXT")]
    pub text: String,
}

pub fn run(args: &ResolveArgs, config: &GatewayConfig) -> Result<()> {
    let resolver = super::resolver(config);
    let code = resolver.resolve_text(&args.text);
    let tag = code.as_deref().and_then(|code| resolver.display_name(code));

    let envelope = QueryEnvelope::ok(
        "resolve",
        json!({
            "text": args.text,
            "code": code,
            "tag": tag,
        }),
    );
    super::emit(&super::with_cache_meta(envelope, &resolver))
}
