use serde::Serialize;

/// A raw event as returned by the log-query service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp_millis: i64,
    pub message: String,
}

/// Half-open `[start, end)` range of epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_millis: i64,
    pub end_millis: i64,
}

impl TimeWindow {
    pub fn contains(&self, timestamp_millis: i64) -> bool {
        timestamp_millis >= self.start_millis && timestamp_millis < self.end_millis
    }

    pub fn duration_millis(&self) -> i64 {
        self.end_millis - self.start_millis
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTarget {
    pub log_group_name: String,
    pub destination_key: String,
}

impl ExportTarget {
    pub fn new(log_group_name: impl Into<String>, destination_key: impl Into<String>) -> Self {
        Self {
            log_group_name: log_group_name.into(),
            destination_key: destination_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExportOutcome {
    Success { message: String, events: usize },
    Failure { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    #[serde(flatten)]
    pub target: ExportTarget,
    #[serde(flatten)]
    pub outcome: ExportOutcome,
}

impl ExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExportOutcome::Success { .. })
    }
}
