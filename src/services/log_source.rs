use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_cloudwatchlogs::Client;

use crate::export::{LogEvent, TimeWindow};

/// One `FilterLogEvents` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    pub log_group_name: String,
    pub window: TimeWindow,
    pub limit: i32,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<LogEvent>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupPage {
    pub names: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("log query service error: {0}")]
    Service(String),
    #[error("malformed log event in {log_group}: {detail}")]
    MalformedEvent { log_group: String, detail: String },
}

/// Paginated view of the log-query service.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// List one page of log group names.
    async fn list_log_groups(&self, next_token: Option<String>) -> Result<GroupPage, SourceError>;

    /// Fetch one page of events for a group inside a window.
    async fn filter_events(&self, request: &FilterRequest) -> Result<EventPage, SourceError>;
}

/// `(startTime, endTime)` for `FilterLogEvents`. The service treats `endTime` as inclusive,
/// so the half-open window's end moves back one millisecond.
pub fn query_bounds(window: &TimeWindow) -> (i64, i64) {
    (window.start_millis, window.end_millis.saturating_sub(1))
}

/// CloudWatch Logs backed source.
#[derive(Clone)]
pub struct CloudWatchLogSource {
    client: Client,
}

impl CloudWatchLogSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl LogSource for CloudWatchLogSource {
    async fn list_log_groups(&self, next_token: Option<String>) -> Result<GroupPage, SourceError> {
        let output = self
            .client
            .describe_log_groups()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| SourceError::Service(DisplayErrorContext(&e).to_string()))?;

        let names = output
            .log_groups()
            .iter()
            .filter_map(|group| group.log_group_name().map(str::to_string))
            .collect();

        Ok(GroupPage {
            names,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn filter_events(&self, request: &FilterRequest) -> Result<EventPage, SourceError> {
        let (start_time, end_time) = query_bounds(&request.window);
        let output = self
            .client
            .filter_log_events()
            .log_group_name(&request.log_group_name)
            .start_time(start_time)
            .end_time(end_time)
            .limit(request.limit)
            .set_next_token(request.next_token.clone())
            .send()
            .await
            .map_err(|e| SourceError::Service(DisplayErrorContext(&e).to_string()))?;

        let mut events = Vec::with_capacity(output.events().len());
        for event in output.events() {
            let timestamp_millis =
                event
                    .timestamp()
                    .ok_or_else(|| SourceError::MalformedEvent {
                        log_group: request.log_group_name.clone(),
                        detail: format!(
                            "event {} has no timestamp",
                            event.event_id().unwrap_or("<unknown>")
                        ),
                    })?;
            events.push(LogEvent {
                timestamp_millis,
                message: event.message().unwrap_or_default().to_string(),
            });
        }

        Ok(EventPage {
            events,
            next_token: output.next_token().map(str::to_string),
        })
    }
}
