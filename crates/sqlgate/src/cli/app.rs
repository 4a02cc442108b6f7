use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    check::CheckArgs, mapping::MappingArgs, policy::PolicyArgs, query::QueryArgs,
    resolve::ResolveArgs, tag::TagArgs,
};
use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "sqlgate",
    version,
    about = "Read-only SQL safety gateway and project reference cache"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    /// SQLite database, opened read-only.
    #[arg(long = "db", global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// JSON policy file; see `sqlgate policy --schema`.
    #[arg(long = "policy", global = true, value_name = "PATH")]
    pub policy_path: Option<PathBuf>,

    #[arg(long, global = true, value_name = "SECONDS")]
    pub cache_ttl_secs: Option<u64>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,
}

impl RuntimeArgs {
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_path: self.db_path.clone(),
            policy_path: self.policy_path.clone(),
            cache_ttl_secs: self.cache_ttl_secs,
            cwd: self.cwd.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate SQL against the policy without touching the database.
    Check(CheckArgs),
    /// Validate, then execute SQL read-only.
    Query(QueryArgs),
    /// Find the project code mentioned in free text.
    Resolve(ResolveArgs),
    /// Show the display tag for a project code.
    Tag(TagArgs),
    /// Print `tag -> code` hint lines.
    Mapping(MappingArgs),
    /// Print the effective policy or its file schema.
    Policy(PolicyArgs),
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Check(_) => "check",
            Self::Query(_) => "query",
            Self::Resolve(_) => "resolve",
            Self::Tag(_) => "tag",
            Self::Mapping(_) => "mapping",
            Self::Policy(_) => "policy",
        }
    }
}
