//! Historical bar retrieval: split a requested span into gateway-sized
//! windows, fetch them under a shared concurrency budget and stitch the
//! results back together in chronological order.

pub mod merge;
pub mod partition;
pub mod scheduler;
pub mod span;

pub use merge::{merge, FetchedChunk, MergePolicy};
pub use partition::{format_period, partition, partition_str, Window, WindowPlan, MAX_BARS_PER_REQUEST};
pub use scheduler::{fetch_all, HistoryLimiter, HistoryTarget, WindowFetcher, WindowRequest};
pub use span::{BarSize, BarUnit, SpanSpec, SpanUnit, SUPPORTED_BAR_SIZES};
