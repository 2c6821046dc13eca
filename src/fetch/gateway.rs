use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::{AppError, Context};

use super::{FetchResult, Gateway, QueryParams};

/// [`Gateway`] backed by an async `reqwest` client pointed at the local
/// trading gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> FetchResult<Self> {
        // The gateway ships with a self-signed certificate.
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to construct gateway HTTP client")?;

        Ok(Self::with_client(config.base_url(), client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get_json(&self, endpoint: &str, query: &QueryParams) -> FetchResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::info!("Something went wrong while requesting {endpoint}: {body}");
            return Err(AppError::UpstreamRequest {
                status: status.as_u16(),
                body,
                window: None,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| AppError::schema(endpoint, err))
    }
}
