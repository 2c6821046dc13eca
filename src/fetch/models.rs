use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hmds {
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub server_name: String,
    pub server_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    pub competing: bool,
    pub connected: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "MAC", default)]
    pub mac: String,
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iserver {
    pub auth_status: AuthStatus,
}

/// Session keep-alive payload returned by `/tickle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tickle {
    pub session: String,
    pub sso_expires: i64,
    pub collission: bool,
    pub user_id: i64,
    pub hmds: Hmds,
    pub iserver: Iserver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub account_id: String,
    #[serde(default)]
    pub account_van: Option<String>,
    #[serde(default)]
    pub account_title: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub account_alias: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub trading_type: Option<String>,
    #[serde(default)]
    pub faclient: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub conid: i64,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(rename = "isUS", default)]
    pub is_us: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub asset_class: Option<String>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

/// `/trsrv/stocks` response keyed by the upper-cased symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conids(pub HashMap<String, Vec<ContractDetails>>);

impl Conids {
    pub fn details(&self, symbol: &str) -> &[ContractDetails] {
        self.0.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First contract of the first result for `symbol`.
    pub fn first_conid(&self, symbol: &str) -> Option<i64> {
        self.details(symbol)
            .first()
            .and_then(|details| details.contracts.first())
            .map(|contract| contract.conid)
    }
}

/// One OHLCV sample. `t` is the bar open time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    #[serde(default)]
    pub v: f64,
}

/// Raw history payload for a single window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalData {
    pub symbol: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub time_period: Option<String>,
    #[serde(default)]
    pub bar_length: Option<i64>,
    #[serde(default)]
    pub outside_rth: Option<bool>,
    #[serde(default)]
    pub data: Vec<Bar>,
}

/// Assembled history handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataResponse {
    pub symbol: String,
    pub data: Vec<Bar>,
}
