//! Log export pipeline.
//!
//! One run resolves its targets (a single group, discovered groups or a fixed list),
//! then for every target fetches the events of the lookback window page by page,
//! formats them as `[<timestamp>] <message>` lines, appends them to whatever is already
//! stored at the target's destination key and writes the merged text back.
//!
//! Merging is literal: overlapping windows produce duplicate lines and a
//! first export starts with a blank line. Consumers that need unique lines deduplicate
//! on read.

pub mod accumulate;
pub mod discover;
pub mod error;
pub mod fetch;
pub mod format;
pub mod orchestrator;
pub mod plan;
pub mod publish;
pub mod report;
pub mod target;
pub mod types;
pub mod window;

pub use error::ExportError;
pub use orchestrator::{ExportSettings, Exporter};
pub use plan::{ExportMode, ExportPlan, ExportRequest, TargetSpec};
pub use report::{ExportReport, ExportResponse};
pub use types::{ExportOutcome, ExportResult, ExportTarget, LogEvent, TimeWindow};
