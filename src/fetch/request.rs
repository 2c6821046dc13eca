use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::history::WindowRequest;

pub type QueryParams = Vec<(&'static str, String)>;

pub const START_TIME_FORMAT: &str = "%Y%m%d-%H:%M:%S";

/// How a window's anchor is expressed on the history endpoint.
///
/// Older gateway builds take an opaque `since` marker, newer ones an explicit
/// `startTime`; the rest of the query is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEncoding {
    #[default]
    StartTime,
    Since,
}

impl WindowEncoding {
    pub fn anchor_param(self, start: NaiveDateTime) -> (&'static str, String) {
        match self {
            WindowEncoding::StartTime => ("startTime", start.format(START_TIME_FORMAT).to_string()),
            WindowEncoding::Since => ("since", start.and_utc().timestamp_millis().to_string()),
        }
    }
}

pub fn history_query(request: &WindowRequest, encoding: WindowEncoding) -> QueryParams {
    let target = &request.target;
    let mut params: QueryParams = vec![
        ("conid", target.conid.clone()),
        ("period", request.window.span.to_string()),
        ("bar", target.bar.to_string()),
    ];

    if let Some(exchange) = &target.exchange {
        params.push(("exchange", exchange.clone()));
    }

    params.push(("outsideRth", target.outside_rth.to_string()));
    params.push(encoding.anchor_param(request.window.start));
    params
}
