use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{AppError, Result};
use crate::fetch::{ensure_concurrency_limit, HistoricalData};

use super::merge::FetchedChunk;
use super::partition::{Window, WindowPlan};
use super::span::BarSize;

/// Budget of in-flight history requests.
///
/// Clones share the same permits, so every retrieval made through one client
/// competes for the same budget.
#[derive(Debug, Clone)]
pub struct HistoryLimiter {
    semaphore: Arc<Semaphore>,
    budget: usize,
}

impl HistoryLimiter {
    pub fn new(budget: usize) -> Self {
        let budget = ensure_concurrency_limit(budget);
        Self {
            semaphore: Arc::new(Semaphore::new(budget)),
            budget,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until a request slot is free.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AppError::message("history limiter was closed"))
    }
}

/// Instrument-level parameters shared by every window of one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTarget {
    pub conid: String,
    pub bar: BarSize,
    pub exchange: Option<String>,
    pub outside_rth: bool,
}

#[derive(Debug, Clone)]
pub struct WindowRequest {
    pub target: HistoryTarget,
    pub window_index: usize,
    pub window: Window,
}

impl WindowRequest {
    pub fn label(&self) -> String {
        format!("#{} {}", self.window_index, self.window)
    }
}

#[async_trait]
pub trait WindowFetcher: Send + Sync {
    async fn fetch_window(&self, request: &WindowRequest) -> Result<HistoricalData>;
}

/// Fetch every window of `plan`, never holding more than the limiter's budget
/// of requests open at once.
///
/// The first failure wins: dropping the pending stream cancels every sibling
/// still in flight and hands its permit back to the limiter.
pub async fn fetch_all<F>(
    fetcher: &F,
    limiter: &HistoryLimiter,
    plan: &WindowPlan,
    target: &HistoryTarget,
) -> Result<Vec<FetchedChunk>>
where
    F: WindowFetcher + ?Sized,
{
    let in_flight = ensure_concurrency_limit(plan.len());

    stream::iter(plan.iter().cloned().enumerate())
        .map(|(window_index, window)| {
            let request = WindowRequest {
                target: target.clone(),
                window_index,
                window,
            };
            async move {
                let _permit = limiter.acquire().await?;
                log::debug!("Requesting history window {}", request.label());

                match fetcher.fetch_window(&request).await {
                    Ok(data) => Ok(FetchedChunk {
                        window_index,
                        data,
                    }),
                    Err(err) => {
                        let label = request.label();
                        log::warn!("History window {label} failed: {err}");
                        Err(err.with_window(label))
                    }
                }
            }
        })
        .buffer_unordered(in_flight)
        .try_collect()
        .await
}
