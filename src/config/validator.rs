use crate::error::{AppError, Result};

use super::GatewayConfig;

/// Validate a gateway configuration and surface every problem at once.
pub fn validate_config(config: &GatewayConfig) -> Result<()> {
    let mut issues = Vec::new();

    validate_url(config, &mut issues);
    validate_paths(config, &mut issues);
    validate_limits(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "gateway config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_url(config: &GatewayConfig, issues: &mut Vec<String>) {
    let url = config.url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        issues.push(format!("url `{url}` must start with http:// or https://"));
    }
}

fn validate_paths(config: &GatewayConfig, issues: &mut Vec<String>) {
    for (name, value) in [
        ("api", &config.api),
        ("history_endpoint", &config.history_endpoint),
    ] {
        if !value.starts_with('/') {
            issues.push(format!("{name} `{value}` must start with `/`"));
        }
    }
}

fn validate_limits(config: &GatewayConfig, issues: &mut Vec<String>) {
    if config.history_concurrency == 0 {
        issues.push("history_concurrency must be at least 1".to_string());
    }
    if config.timeout_secs == 0 {
        issues.push("timeout_secs must be at least 1".to_string());
    }
}
