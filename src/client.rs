use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{validate_config, GatewayConfig};
use crate::error::{AppError, Result};
use crate::fetch::{
    history_query, Account, Conids, Gateway, HistoricalData, HistoricalDataResponse, HttpGateway,
    QueryParams, Tickle, PORTFOLIO_ACCOUNTS_ENDPOINT, TICKLE_ENDPOINT, TRSRV_STOCKS_ENDPOINT,
};
use crate::history::{
    fetch_all, merge, partition, BarSize, HistoryLimiter, HistoryTarget, SpanSpec, WindowFetcher,
    WindowRequest, SUPPORTED_BAR_SIZES,
};

/// Parameters of one historical retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: String,
    pub period: String,
    pub bar: String,
    pub from: NaiveDateTime,
    pub exchange: Option<String>,
    pub outside_rth: bool,
}

impl HistoryRequest {
    pub fn new(
        symbol: impl Into<String>,
        period: impl Into<String>,
        bar: impl Into<String>,
        from: NaiveDateTime,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            period: period.into(),
            bar: bar.into(),
            from,
            exchange: None,
            outside_rth: false,
        }
    }

    pub fn exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn outside_rth(mut self, outside_rth: bool) -> Self {
        self.outside_rth = outside_rth;
        self
    }
}

/// Client for the gateway REST API.
///
/// Every history retrieval issued through one client draws on the same
/// [`HistoryLimiter`]; clone the client (or share the limiter) to keep that
/// budget common across tasks.
#[derive(Clone)]
pub struct IbRestClient {
    config: GatewayConfig,
    gateway: Arc<dyn Gateway>,
    limiter: HistoryLimiter,
}

impl IbRestClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        validate_config(&config)?;
        let gateway = HttpGateway::new(&config)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    pub fn with_gateway(config: GatewayConfig, gateway: Arc<dyn Gateway>) -> Self {
        let limiter = HistoryLimiter::new(config.history_concurrency);
        Self {
            config,
            gateway,
            limiter,
        }
    }

    /// Swap in a limiter shared with other clients.
    pub fn with_limiter(mut self, limiter: HistoryLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn limiter(&self) -> &HistoryLimiter {
        &self.limiter
    }

    pub async fn tickle(&self) -> Result<Tickle> {
        let tickle = self.get(TICKLE_ENDPOINT, &Vec::new()).await?;
        log::info!("Successfully pinged the gateway");
        Ok(tickle)
    }

    pub async fn get_accounts(&self) -> Result<Vec<Account>> {
        let accounts: Vec<Account> = self.get(PORTFOLIO_ACCOUNTS_ENDPOINT, &Vec::new()).await?;
        log::info!("Fetched {} accounts from the gateway", accounts.len());
        Ok(accounts)
    }

    pub async fn get_contract_details<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Conids> {
        let joined = symbols
            .iter()
            .map(|symbol| symbol.as_ref().trim().to_uppercase())
            .collect::<Vec<_>>()
            .join(",");

        let conids: Conids = self
            .get(TRSRV_STOCKS_ENDPOINT, &vec![("symbols", joined.clone())])
            .await?;
        log::info!("Fetched stock contract details for {joined}");
        Ok(conids)
    }

    /// Contract id of the first contract in the first lookup result.
    pub async fn resolve_conid(&self, symbol: &str) -> Result<i64> {
        let symbol = symbol.trim().to_uppercase();
        let conids = self.get_contract_details(&[symbol.as_str()]).await?;

        conids.first_conid(&symbol).ok_or_else(|| {
            log::info!("{symbol} is potentially invalid. No contract details found.");
            AppError::InvalidSymbol(symbol)
        })
    }

    pub async fn get_historical_data(
        &self,
        symbol: &str,
        period: &str,
        bar: &str,
        from: NaiveDateTime,
    ) -> Result<HistoricalDataResponse> {
        self.get_historical_data_with(&HistoryRequest::new(symbol, period, bar, from))
            .await
    }

    /// Retrieve `request.period` worth of bars starting at `request.from`,
    /// splitting the span into gateway-sized windows. All or nothing: any
    /// failing window fails the whole retrieval.
    pub async fn get_historical_data_with(
        &self,
        request: &HistoryRequest,
    ) -> Result<HistoricalDataResponse> {
        let span: SpanSpec = request.period.parse()?;
        let bar: BarSize = request.bar.parse()?;
        if !bar.is_gateway_supported() {
            return Err(AppError::invalid_format(format!(
                "bar size `{bar}` is not accepted by the gateway (expected one of {})",
                SUPPORTED_BAR_SIZES.join(", ")
            )));
        }

        let symbol = request.symbol.trim().to_uppercase();
        let conid = self.resolve_conid(&symbol).await?;

        let plan = partition(span, bar, request.from)?;
        log::info!(
            "Fetching {span} of {bar} bars for {symbol} in {} window(s)",
            plan.len()
        );

        let target = HistoryTarget {
            conid: conid.to_string(),
            bar,
            exchange: request.exchange.clone(),
            outside_rth: request.outside_rth,
        };
        let chunks = fetch_all(self, &self.limiter, &plan, &target).await?;

        Ok(merge(&symbol, chunks, self.config.merge_policy))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &QueryParams) -> Result<T> {
        let body = self.gateway.get_json(endpoint, query).await?;
        decode(endpoint, body)
    }
}

#[async_trait]
impl WindowFetcher for IbRestClient {
    async fn fetch_window(&self, request: &WindowRequest) -> Result<HistoricalData> {
        let query = history_query(request, self.config.window_encoding);
        let data: HistoricalData = self.get(&self.config.history_endpoint, &query).await?;
        log::info!(
            "Fetched {} bars for window {}",
            data.data.len(),
            request.label()
        );
        Ok(data)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|err| AppError::schema(endpoint, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HISTORICAL_DATA_ENDPOINT;
    use chrono::{Duration, NaiveDate};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    /// In-memory gateway: resolves `AAPL` only and synthesises one bar per
    /// bar-length across each requested window, including the window's end
    /// instant so neighbouring windows overlap by one bar.
    #[derive(Default)]
    struct FakeGateway {
        history_calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail_start: Option<String>,
        malformed: bool,
        symbol_queries: Mutex<Vec<String>>,
    }

    fn param<'a>(query: &'a QueryParams, key: &str) -> &'a str {
        query
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }

    impl FakeGateway {
        fn history(&self, query: &QueryParams) -> Result<Value> {
            let start_raw = param(query, "startTime");
            if self.fail_start.as_deref() == Some(start_raw) {
                return Err(AppError::UpstreamRequest {
                    status: 503,
                    body: "hmds unavailable".to_string(),
                    window: None,
                });
            }
            if self.malformed {
                return Ok(json!({"error": "unexpected"}));
            }

            let start = NaiveDateTime::parse_from_str(start_raw, "%Y%m%d-%H:%M:%S").unwrap();
            let span: SpanSpec = param(query, "period").parse().unwrap();
            let bar: BarSize = param(query, "bar").parse().unwrap();
            let end = span.end_from(start).unwrap();
            let step = bar.duration_at(start).unwrap();

            let mut bars = Vec::new();
            let mut cursor = start;
            while cursor <= end {
                let t = cursor.and_utc().timestamp_millis();
                bars.push(json!({"t": t, "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5, "v": 10.0}));
                cursor += step;
            }

            Ok(json!({"symbol": "AAPL", "text": "APPLE INC", "data": bars}))
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn get_json(&self, endpoint: &str, query: &QueryParams) -> Result<Value> {
            match endpoint {
                TRSRV_STOCKS_ENDPOINT => {
                    let symbols = param(query, "symbols").to_string();
                    self.symbol_queries.lock().unwrap().push(symbols.clone());
                    if symbols == "AAPL" {
                        Ok(json!({"AAPL": [{"name": "APPLE INC", "contracts": [{"conid": 265598, "exchange": "NASDAQ", "isUS": true}]}]}))
                    } else {
                        Ok(json!({}))
                    }
                }
                HISTORICAL_DATA_ENDPOINT => {
                    let call = self.history_calls.fetch_add(1, Ordering::SeqCst) as u64;
                    let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    self.peak.fetch_max(current, Ordering::SeqCst);

                    // Later requests answer first so arrival order is reversed.
                    let delay = 5 + 30u64.saturating_sub(10 * call);
                    sleep(std::time::Duration::from_millis(delay)).await;

                    let outcome = self.history(query);
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    outcome
                }
                other => panic!("unexpected endpoint {other}"),
            }
        }
    }

    fn anchor() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn client(gateway: Arc<FakeGateway>, concurrency: usize) -> IbRestClient {
        let config = GatewayConfig {
            history_concurrency: concurrency,
            ..GatewayConfig::builtin()
        };
        IbRestClient::with_gateway(config, gateway)
    }

    #[tokio::test]
    async fn stitches_windows_into_one_ordered_series() {
        let gateway = Arc::new(FakeGateway::default());
        let client = client(Arc::clone(&gateway), 3);

        let series = client
            .get_historical_data("aapl", "2500min", "1min", anchor())
            .await
            .unwrap();

        assert_eq!(series.symbol, "AAPL");
        assert_eq!(gateway.history_calls.load(Ordering::SeqCst), 3);
        // 2500 one-minute bars plus the closing instant of the last window.
        assert_eq!(series.data.len(), 2501);
        assert!(series.data.windows(2).all(|pair| pair[0].t < pair[1].t));
        assert_eq!(series.data[0].t, anchor().and_utc().timestamp_millis());
        assert_eq!(
            series.data[1000].t,
            (anchor() + Duration::minutes(1000)).and_utc().timestamp_millis()
        );
        assert_eq!(*gateway.symbol_queries.lock().unwrap(), vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn keep_all_policy_surfaces_boundary_bars() {
        let gateway = Arc::new(FakeGateway::default());
        let config = GatewayConfig {
            merge_policy: crate::history::MergePolicy::KeepAll,
            ..GatewayConfig::builtin()
        };
        let client = IbRestClient::with_gateway(config, gateway);

        let series = client
            .get_historical_data("AAPL", "2500min", "1min", anchor())
            .await
            .unwrap();

        assert_eq!(series.data.len(), 2503);
        assert!(series.data.windows(2).all(|pair| pair[0].t <= pair[1].t));
    }

    #[tokio::test]
    async fn unknown_symbol_fails_before_any_history_request() {
        let gateway = Arc::new(FakeGateway::default());
        let client = client(Arc::clone(&gateway), 3);

        let err = client
            .get_historical_data("NOPE", "1d", "1h", anchor())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidSymbol(ref s) if s == "NOPE"));
        assert_eq!(gateway.history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_window_fails_the_retrieval() {
        let failing_start = (anchor() + Duration::minutes(1000))
            .format("%Y%m%d-%H:%M:%S")
            .to_string();
        let gateway = Arc::new(FakeGateway {
            fail_start: Some(failing_start),
            ..FakeGateway::default()
        });
        let client = client(gateway, 3);

        let err = client
            .get_historical_data("AAPL", "2500min", "1min", anchor())
            .await
            .unwrap_err();

        match err {
            AppError::UpstreamRequest { status, body, window } => {
                assert_eq!(status, 503);
                assert_eq!(body, "hmds unavailable");
                assert!(window.unwrap().starts_with("#1 "));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.limiter().available(), 3);
    }

    #[tokio::test]
    async fn malformed_chunk_is_a_schema_failure() {
        let gateway = Arc::new(FakeGateway {
            malformed: true,
            ..FakeGateway::default()
        });
        let client = client(gateway, 2);

        let err = client
            .get_historical_data("AAPL", "2d", "1h", anchor())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SchemaValidation { window: Some(_), .. }));
    }

    #[tokio::test]
    async fn bad_inputs_are_rejected_locally() {
        let gateway = Arc::new(FakeGateway::default());
        let client = client(Arc::clone(&gateway), 2);

        for (period, bar) in [("5x", "1min"), ("1d", "abc"), ("1d", "7min")] {
            let err = client
                .get_historical_data("AAPL", period, bar, anchor())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidFormat(_)), "{period}/{bar}: {err}");
        }
        assert!(gateway.symbol_queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_retrievals_share_the_client_budget() {
        let gateway = Arc::new(FakeGateway::default());
        let client = client(Arc::clone(&gateway), 2);

        let (a, b) = tokio::join!(
            client.get_historical_data("AAPL", "5000min", "1min", anchor()),
            client.get_historical_data("AAPL", "4000min", "1min", anchor()),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(gateway.history_calls.load(Ordering::SeqCst), 9);
        assert!(gateway.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn exchange_and_outside_rth_reach_the_gateway() {
        #[derive(Default)]
        struct Capture(Mutex<Vec<QueryParams>>);

        #[async_trait]
        impl Gateway for Capture {
            async fn get_json(&self, endpoint: &str, query: &QueryParams) -> Result<Value> {
                if endpoint == TRSRV_STOCKS_ENDPOINT {
                    return Ok(json!({"MSFT": [{"contracts": [{"conid": 272093}]}]}));
                }
                self.0.lock().unwrap().push(query.clone());
                Ok(json!({"symbol": "MSFT", "data": []}))
            }
        }

        let capture = Arc::new(Capture::default());
        let client = IbRestClient::with_gateway(GatewayConfig::builtin(), capture.clone());
        let request = HistoryRequest::new("msft", "1w", "1d", anchor())
            .exchange("NASDAQ")
            .outside_rth(true);

        let series = client.get_historical_data_with(&request).await.unwrap();

        assert_eq!(series.symbol, "MSFT");
        assert!(series.data.is_empty());
        let queries = capture.0.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(param(&queries[0], "conid"), "272093");
        assert_eq!(param(&queries[0], "period"), "1w");
        assert_eq!(param(&queries[0], "exchange"), "NASDAQ");
        assert_eq!(param(&queries[0], "outsideRth"), "true");
        assert_eq!(param(&queries[0], "startTime"), "20240102-09:30:00");
    }

    #[tokio::test]
    async fn clients_can_share_one_limiter() {
        let gateway = Arc::new(FakeGateway::default());
        let shared = HistoryLimiter::new(2);
        let first = client(Arc::clone(&gateway), 5).with_limiter(shared.clone());
        let second = client(Arc::clone(&gateway), 5).with_limiter(shared.clone());

        let (a, b) = tokio::join!(
            first.get_historical_data("AAPL", "4000min", "1min", anchor()),
            second.get_historical_data("AAPL", "4000min", "1min", anchor()),
        );

        assert!(a.is_ok() && b.is_ok());
        assert!(gateway.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(shared.available(), 2);
    }

    #[tokio::test]
    async fn decodes_session_and_account_endpoints() {
        struct Static;

        #[async_trait]
        impl Gateway for Static {
            async fn get_json(&self, endpoint: &str, _query: &QueryParams) -> Result<Value> {
                match endpoint {
                    TICKLE_ENDPOINT => Ok(json!({
                        "session": "f00d",
                        "ssoExpires": 600000,
                        "collission": false,
                        "userId": 7,
                        "hmds": {"error": ""},
                        "iserver": {"authStatus": {
                            "authenticated": true,
                            "competing": false,
                            "connected": true,
                            "message": "",
                            "MAC": "AA:BB",
                            "serverInfo": {"serverName": "gw", "serverVersion": "10.30"}
                        }}
                    })),
                    PORTFOLIO_ACCOUNTS_ENDPOINT => Ok(json!([
                        {"id": "DU100", "accountId": "DU100", "currency": "USD", "type": "DEMO"}
                    ])),
                    _ => Err(AppError::UpstreamRequest {
                        status: 404,
                        body: "not found".to_string(),
                        window: None,
                    }),
                }
            }
        }

        let client = IbRestClient::with_gateway(GatewayConfig::builtin(), Arc::new(Static));

        let tickle = client.tickle().await.unwrap();
        assert_eq!(tickle.session, "f00d");

        let accounts = client.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_type.as_deref(), Some("DEMO"));

        let err = client.get_contract_details(&["AAPL"]).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamRequest { status: 404, .. }));
    }

    #[test]
    fn rejects_invalid_config_before_building_transport() {
        let config = GatewayConfig {
            history_concurrency: 0,
            ..GatewayConfig::builtin()
        };

        assert!(matches!(IbRestClient::new(config), Err(AppError::Config(_))));
    }
}
