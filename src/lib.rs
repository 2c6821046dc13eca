pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod utils;

pub use client::{HistoryRequest, IbRestClient};
pub use error::{AppError, Result};
