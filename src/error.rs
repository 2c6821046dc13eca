use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("{0} is potentially invalid. No contract details found.")]
    InvalidSymbol(String),
    #[error("request failed with status {status}{}: {body}", window_suffix(.window))]
    UpstreamRequest {
        status: u16,
        body: String,
        window: Option<String>,
    },
    #[error("unexpected response shape from {endpoint}{}: {detail}", window_suffix(.window))]
    SchemaValidation {
        endpoint: String,
        detail: String,
        window: Option<String>,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("transport failure{}: {source}", window_suffix(.window))]
    Transport {
        #[source]
        source: reqwest::Error,
        window: Option<String>,
    },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn window_suffix(window: &Option<String>) -> String {
    match window {
        Some(label) => format!(" (window {label})"),
        None => String::new(),
    }
}

impl From<reqwest::Error> for AppError {
    fn from(source: reqwest::Error) -> Self {
        AppError::Transport {
            source,
            window: None,
        }
    }
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn invalid_format<T: Into<String>>(msg: T) -> Self {
        AppError::InvalidFormat(msg.into())
    }

    pub fn schema(endpoint: &str, err: serde_json::Error) -> Self {
        AppError::SchemaValidation {
            endpoint: endpoint.to_string(),
            detail: err.to_string(),
            window: None,
        }
    }

    /// Tag an upstream, schema or transport failure with the window that
    /// produced it.
    /// Other variants pass through untouched.
    pub fn with_window(self, label: impl Into<String>) -> Self {
        match self {
            AppError::UpstreamRequest { status, body, .. } => AppError::UpstreamRequest {
                status,
                body,
                window: Some(label.into()),
            },
            AppError::SchemaValidation {
                endpoint, detail, ..
            } => AppError::SchemaValidation {
                endpoint,
                detail,
                window: Some(label.into()),
            },
            AppError::Transport { source, .. } => AppError::Transport {
                source,
                window: Some(label.into()),
            },
            other => other,
        }
    }
}
