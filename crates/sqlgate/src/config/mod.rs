use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::policy::Policy;
use crate::resolver::DEFAULT_CACHE_TTL;

pub const DB_PATH_ENV: &str = "DB_PATH";
pub const POLICY_PATH_ENV: &str = "SQLGATE_POLICY";
pub const CACHE_TTL_ENV: &str = "SQLGATE_CACHE_TTL_SECS";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

pub const DEFAULT_DB_FILE_NAME: &str = "leads.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Values given explicitly on the command line. They win over the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub db_path: Option<PathBuf>,
    pub policy_path: Option<PathBuf>,
    pub cache_ttl_secs: Option<u64>,
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub db_path: PathBuf,
    pub policy_path: Option<PathBuf>,
    pub policy: Policy,
    pub cache_ttl: Duration,
    pub log_filter: String,
}

/// Loads `.env` from the working directory or its parents, if present.
/// Variables already set in the process environment are not overwritten.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(error) if error.not_found() => Ok(None),
        Err(error) => Err(error).context("failed to load .env file"),
    }
}

/// Resolves configuration from the live process environment.
pub fn load_gateway_config(overrides: &ConfigOverrides) -> Result<GatewayConfig> {
    let cwd = match &overrides.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("unable to determine current directory")?,
    };
    let home_dir = std::env::var_os("HOME").map(PathBuf::from);
    resolve_gateway_config(
        overrides,
        &|name| std::env::var(name).ok(),
        home_dir.as_deref(),
        &cwd,
    )
}

/// Flags, then `env`, then defaults. Relative paths resolve against `cwd`.
pub fn resolve_gateway_config(
    overrides: &ConfigOverrides,
    env: &dyn Fn(&str) -> Option<String>,
    home_dir: Option<&Path>,
    cwd: &Path,
) -> Result<GatewayConfig> {
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }
    let cwd = normalize_lexical(cwd);
    let env_value = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    let db_path = match overrides
        .db_path
        .clone()
        .or_else(|| env_value(DB_PATH_ENV).map(PathBuf::from))
    {
        Some(path) => resolve_user_path(&path, home_dir, &cwd)?,
        None => cwd.join(DEFAULT_DB_FILE_NAME),
    };

    let policy_path = overrides
        .policy_path
        .clone()
        .or_else(|| env_value(POLICY_PATH_ENV).map(PathBuf::from))
        .map(|path| resolve_user_path(&path, home_dir, &cwd))
        .transpose()?;
    let policy = match &policy_path {
        Some(path) => Policy::load(path)?,
        None => Policy::default(),
    };

    let cache_ttl = match overrides.cache_ttl_secs {
        Some(seconds) => Duration::from_secs(seconds),
        None => match env_value(CACHE_TTL_ENV) {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().with_context(|| {
                format!("{CACHE_TTL_ENV} must be a whole number of seconds, got `{raw}`")
            })?),
            None => DEFAULT_CACHE_TTL,
        },
    };

    let log_filter = env_value(LOG_LEVEL_ENV)
        .map(|level| level.trim().to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    Ok(GatewayConfig {
        db_path,
        policy_path,
        policy,
        cache_ttl,
        log_filter,
    })
}

fn resolve_user_path(path: &Path, home_dir: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: Option<&Path>) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let Some(home_dir) = home_dir else {
                bail!("HOME is not set; cannot expand {}", path.display());
            };
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
