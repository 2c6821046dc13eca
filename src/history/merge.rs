use serde::{Deserialize, Serialize};

use crate::fetch::{Bar, HistoricalData, HistoricalDataResponse};

/// Result of one window fetch, tagged with the window's position in the plan.
#[derive(Debug, Clone)]
pub struct FetchedChunk {
    pub window_index: usize,
    pub data: HistoricalData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Concatenate chunks exactly as returned.
    KeepAll,
    /// Skip leading bars of a chunk whose timestamp equals the last merged bar,
    /// which drops the instant both neighbouring windows report. Bars with any
    /// other timestamp are kept.
    #[default]
    DropBoundaryDuplicates,
}

/// Reassemble chunks in window order. Bars inside a chunk are kept in the
/// order the gateway returned them.
///
/// The merged symbol is the one reported by the lowest-indexed chunk that
/// carries one; `requested` is used when no chunk does.
pub fn merge(
    requested: &str,
    mut chunks: Vec<FetchedChunk>,
    policy: MergePolicy,
) -> HistoricalDataResponse {
    chunks.sort_by_key(|chunk| chunk.window_index);

    let symbol = chunks
        .iter()
        .map(|chunk| chunk.data.symbol.as_str())
        .find(|symbol| !symbol.is_empty())
        .unwrap_or(requested)
        .to_string();

    let capacity = chunks.iter().map(|chunk| chunk.data.data.len()).sum();
    let mut bars: Vec<Bar> = Vec::with_capacity(capacity);
    let mut dropped = 0usize;

    for chunk in chunks {
        let last_t = bars.last().map(|bar| bar.t);
        let mut incoming = chunk.data.data.into_iter().peekable();

        if let (MergePolicy::DropBoundaryDuplicates, Some(last_t)) = (policy, last_t) {
            while incoming.next_if(|bar| bar.t == last_t).is_some() {
                dropped += 1;
            }
        }

        bars.extend(incoming);
    }

    if dropped > 0 {
        log::debug!("Dropped {dropped} overlapping bars while merging {symbol}");
    }

    HistoricalDataResponse { symbol, data: bars }
}
