use std::time::Duration;

use super::error::{bounded, ExportError};
use super::types::{LogEvent, TimeWindow};
use crate::services::log_source::{FilterRequest, LogSource};

/// Fetch every event of `log_group` inside `window`, following the continuation cursor
/// until the service stops returning one. Pages are concatenated as returned.
pub async fn fetch_events(
    source: &dyn LogSource,
    log_group: &str,
    window: TimeWindow,
    page_limit: i32,
    call_timeout: Duration,
) -> Result<Vec<LogEvent>, ExportError> {
    let query_error = |message: String| ExportError::SourceQuery {
        log_group: log_group.to_string(),
        message,
    };

    let mut events = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let request = FilterRequest {
            log_group_name: log_group.to_string(),
            window,
            limit: page_limit,
            next_token: next_token.take(),
        };

        let page = bounded(call_timeout, "filter_log_events", source.filter_events(&request))
            .await
            .map_err(|e| query_error(e.to_string()))?
            .map_err(|e| query_error(e.to_string()))?;
        pages += 1;
        events.extend(page.events);

        match page.next_token {
            Some(token) if !token.is_empty() => {
                if request.next_token.as_deref() == Some(token.as_str()) {
                    return Err(query_error(format!(
                        "pagination cursor did not advance after {pages} pages"
                    )));
                }
                next_token = Some(token);
            }
            _ => break,
        }
    }

    tracing::debug!(log_group, pages, events = events.len(), "Fetched log events");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::services::log_source::{EventPage, GroupPage, SourceError};
    use crate::services::memory::InMemoryLogSource;

    const WINDOW: TimeWindow = TimeWindow {
        start_millis: 1_000,
        end_millis: 10_000,
    };

    fn event(ts: i64, message: &str) -> LogEvent {
        LogEvent {
            timestamp_millis: ts,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn concatenates_pages_with_n_plus_one_requests() {
        let source = InMemoryLogSource::new();
        source.push_page("/g", vec![event(1_001, "a"), event(1_002, "b")]);
        source.push_page("/g", vec![event(2_000, "c")]);
        source.push_page("/g", vec![event(3_000, "d")]);
        source.push_page("/g", vec![]);

        let events = fetch_events(&source, "/g", WINDOW, 500, Duration::from_secs(1))
            .await
            .unwrap();
        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b", "c", "d"]);

        let requests = source.filter_requests("/g");
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.window == WINDOW && r.limit == 500));
        assert_eq!(requests[0].next_token, None);
        assert_eq!(requests[3].next_token.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn no_deduplication_across_pages() {
        let source = InMemoryLogSource::new();
        source.push_page("/g", vec![event(1_500, "same")]);
        source.push_page("/g", vec![event(1_500, "same")]);

        let events = fetch_events(&source, "/g", WINDOW, 10, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn failed_page_aborts_the_group() {
        let source = InMemoryLogSource::new();
        source.fail_group("/g", "AccessDeniedException");

        let err = fetch_events(&source, "/g", WINDOW, 10, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::SourceQuery { .. }));
        assert!(err.to_string().contains("AccessDeniedException"));
    }

    struct StuckCursor {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl LogSource for StuckCursor {
        async fn list_log_groups(&self, _: Option<String>) -> Result<GroupPage, SourceError> {
            Ok(GroupPage::default())
        }

        async fn filter_events(&self, _: &FilterRequest) -> Result<EventPage, SourceError> {
            *self.calls.lock().unwrap() += 1;
            Ok(EventPage {
                events: vec![],
                next_token: Some("again".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn repeated_cursor_is_an_error() {
        let source = StuckCursor {
            calls: Mutex::new(0),
        };
        let err = fetch_events(&source, "/g", WINDOW, 10, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "SOURCE_QUERY_ERROR");
        assert_eq!(*source.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_cursor_terminates() {
        struct EmptyCursor;

        #[async_trait]
        impl LogSource for EmptyCursor {
            async fn list_log_groups(&self, _: Option<String>) -> Result<GroupPage, SourceError> {
                Ok(GroupPage::default())
            }

            async fn filter_events(&self, _: &FilterRequest) -> Result<EventPage, SourceError> {
                Ok(EventPage {
                    events: vec![LogEvent {
                        timestamp_millis: 2_000,
                        message: "x".to_string(),
                    }],
                    next_token: Some(String::new()),
                })
            }
        }

        let events = fetch_events(&EmptyCursor, "/g", WINDOW, 10, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }
}
