use std::{env, fs, path::Path};

use serde::Deserialize;

use crate::error::{AppError, Context, Result};
use crate::fetch::WindowEncoding;
use crate::history::MergePolicy;

use super::{validator, GatewayConfig};

pub const DEFAULT_CONFIG_FILE: &str = "ibrest.json";

const ENV_URL: &str = "IBREST_URL";
const ENV_API: &str = "IBREST_API";
const ENV_VERIFY_SSL: &str = "IBREST_VERIFY_SSL";
const ENV_TIMEOUT_SECS: &str = "IBREST_TIMEOUT_SECS";
const ENV_HISTORY_CONCURRENCY: &str = "IBREST_HISTORY_CONCURRENCY";

/// Load the gateway configuration from `path`, falling back to the builtin
/// defaults when the file does not exist, then apply `IBREST_*` overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig> {
    let mut config = if path.exists() {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read gateway config at {}", path.display()))?;
        parse_config(&json)
            .with_context(|| format!("failed to parse gateway config at {}", path.display()))?
    } else {
        log::debug!(
            "No gateway config at {}, using builtin defaults",
            path.display()
        );
        GatewayConfig::builtin()
    };

    apply_overrides(&mut config, |key| env::var(key).ok())?;
    validator::validate_config(&config)?;

    Ok(config)
}

pub fn parse_config(json: &str) -> Result<GatewayConfig> {
    let raw: RawGatewayConfig = serde_json::from_str(json)?;
    Ok(raw.into_config())
}

fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_URL) {
        config.url = url;
    }
    if let Some(api) = lookup(ENV_API) {
        config.api = api;
    }
    if let Some(raw) = lookup(ENV_VERIFY_SSL) {
        config.verify_ssl = parse_env(ENV_VERIFY_SSL, &raw)?;
    }
    if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
        config.timeout_secs = parse_env(ENV_TIMEOUT_SECS, &raw)?;
    }
    if let Some(raw) = lookup(ENV_HISTORY_CONCURRENCY) {
        config.history_concurrency = parse_env(ENV_HISTORY_CONCURRENCY, &raw)?;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key} has an invalid value `{raw}`")))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGatewayConfig {
    url: Option<String>,
    api: Option<String>,
    verify_ssl: Option<bool>,
    timeout_secs: Option<u64>,
    history_concurrency: Option<usize>,
    history_endpoint: Option<String>,
    window_encoding: Option<WindowEncoding>,
    merge_policy: Option<MergePolicy>,
}

impl RawGatewayConfig {
    fn into_config(self) -> GatewayConfig {
        let defaults = GatewayConfig::builtin();
        GatewayConfig {
            url: self.url.unwrap_or(defaults.url),
            api: self.api.unwrap_or(defaults.api),
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            history_concurrency: self
                .history_concurrency
                .unwrap_or(defaults.history_concurrency),
            history_endpoint: self.history_endpoint.unwrap_or(defaults.history_endpoint),
            window_encoding: self.window_encoding.unwrap_or(defaults.window_encoding),
            merge_policy: self.merge_policy.unwrap_or(defaults.merge_policy),
        }
    }
}
