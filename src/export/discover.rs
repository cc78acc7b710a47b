use std::time::Duration;

use super::error::{bounded, ExportError};
use crate::services::log_source::LogSource;

/// Which log groups discovery keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilter {
    pub prefix: String,
    /// Groups containing this substring are dropped even when the prefix matches.
    /// Empty excludes nothing.
    pub deny_substring: String,
}

impl GroupFilter {
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
            && (self.deny_substring.is_empty() || !name.contains(&self.deny_substring))
    }
}

/// List every log group and keep those accepted by `filter`, in listing order.
pub async fn discover_groups(
    source: &dyn LogSource,
    filter: &GroupFilter,
    call_timeout: Duration,
) -> Result<Vec<String>, ExportError> {
    let mut groups = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let sent = next_token.clone();
        let page = bounded(
            call_timeout,
            "describe_log_groups",
            source.list_log_groups(next_token.take()),
        )
        .await
        .map_err(|e| ExportError::Discovery(e.to_string()))?
        .map_err(|e| ExportError::Discovery(e.to_string()))?;
        pages += 1;

        groups.extend(page.names.into_iter().filter(|name| filter.matches(name)));

        match page.next_token {
            Some(token) if !token.is_empty() => {
                if sent.as_deref() == Some(token.as_str()) {
                    return Err(ExportError::Discovery(
                        "describe_log_groups returned the same cursor twice".to_string(),
                    ));
                }
                next_token = Some(token);
            }
            _ => break,
        }
    }

    tracing::info!(
        pages,
        matched = groups.len(),
        prefix = %filter.prefix,
        "Discovered log groups"
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryLogSource;

    fn lambda_filter() -> GroupFilter {
        GroupFilter {
            prefix: "/aws/lambda/".to_string(),
            deny_substring: "aws-logs-write-test".to_string(),
        }
    }

    #[test]
    fn deny_substring_beats_prefix() {
        let filter = lambda_filter();
        assert!(filter.matches("/aws/lambda/site"));
        assert!(!filter.matches("/aws/lambda/aws-logs-write-test"));
        assert!(!filter.matches("/aws/ecs/site"));
    }

    #[test]
    fn empty_deny_substring_excludes_nothing() {
        let filter = GroupFilter {
            prefix: "/aws/".to_string(),
            deny_substring: String::new(),
        };
        assert!(filter.matches("/aws/lambda/aws-logs-write-test"));
    }

    #[tokio::test]
    async fn follows_cursor_across_pages() {
        let source = InMemoryLogSource::new();
        for name in [
            "/aws/lambda/a",
            "/aws/ecs/b",
            "/aws/lambda/aws-logs-write-test",
            "/aws/lambda/c",
            "/aws/lambda/d",
        ] {
            source.add_group(name);
        }
        source.set_group_page_size(2);

        let groups = discover_groups(&source, &lambda_filter(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(groups, vec!["/aws/lambda/a", "/aws/lambda/c", "/aws/lambda/d"]);
        assert_eq!(source.list_calls(), 3);
    }

    #[tokio::test]
    async fn empty_listing_is_not_an_error() {
        let source = InMemoryLogSource::new();
        let groups = discover_groups(&source, &lambda_filter(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn service_failure_yields_no_partial_result() {
        let source = InMemoryLogSource::new();
        source.add_group("/aws/lambda/a");
        source.fail_discovery("ThrottlingException: rate exceeded");

        let err = discover_groups(&source, &lambda_filter(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Discovery(_)));
        assert!(err.to_string().contains("ThrottlingException"));
    }
}
