use serde::Serialize;

use crate::fetch::{WindowEncoding, HISTORICAL_DATA_ENDPOINT};
use crate::history::MergePolicy;

pub mod loader;
pub mod validator;

pub use loader::{load_config, DEFAULT_CONFIG_FILE};
pub use validator::validate_config;

pub const DEFAULT_GATEWAY_URL: &str = "https://127.0.0.1:5000";
pub const DEFAULT_API_PREFIX: &str = "/v1/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HISTORY_CONCURRENCY: usize = 5;

/// Everything needed to talk to one gateway instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayConfig {
    pub url: String,
    pub api: String,
    pub verify_ssl: bool,
    pub timeout_secs: u64,
    /// Maximum history requests in flight across all retrievals on one client.
    pub history_concurrency: usize,
    pub history_endpoint: String,
    pub window_encoding: WindowEncoding,
    pub merge_policy: MergePolicy,
}

impl GatewayConfig {
    pub fn builtin() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            api: DEFAULT_API_PREFIX.to_string(),
            verify_ssl: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            history_concurrency: DEFAULT_HISTORY_CONCURRENCY,
            history_endpoint: HISTORICAL_DATA_ENDPOINT.to_string(),
            window_encoding: WindowEncoding::StartTime,
            merge_policy: MergePolicy::DropBoundaryDuplicates,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.api)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builtin()
    }
}
