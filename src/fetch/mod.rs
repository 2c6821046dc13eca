use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod gateway;
pub mod models;
pub mod request;

pub use gateway::HttpGateway;
pub use models::{
    Account, Bar, Conids, Contract, ContractDetails, HistoricalData, HistoricalDataResponse,
    Tickle,
};
pub use request::{history_query, QueryParams, WindowEncoding};

pub const TICKLE_ENDPOINT: &str = "/tickle";
pub const PORTFOLIO_ACCOUNTS_ENDPOINT: &str = "/portfolio/accounts";
pub const TRSRV_STOCKS_ENDPOINT: &str = "/trsrv/stocks";
pub const HISTORICAL_DATA_ENDPOINT: &str = "/iserver/marketdata/history";

pub type FetchResult<T> = Result<T>;

/// Read-only access to the gateway REST API.
///
/// Implementations return the decoded JSON body on success and
/// [`AppError::UpstreamRequest`](crate::error::AppError::UpstreamRequest)
/// carrying the response text for any non-success status.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get_json(&self, endpoint: &str, query: &QueryParams) -> FetchResult<Value>;
}

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}
