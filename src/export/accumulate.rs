use std::time::Duration;

use super::error::{bounded, ExportError};
use crate::services::blob_store::BlobStore;

/// Current content at `key`. A missing object reads as empty; every other failure is an error.
pub async fn read_existing(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
    call_timeout: Duration,
) -> Result<String, ExportError> {
    let read_error = |message: String| ExportError::DestinationRead {
        key: key.to_string(),
        message,
    };

    let read = bounded(call_timeout, "get_object", store.get_text(bucket, key))
        .await
        .map_err(|e| read_error(e.to_string()))?;

    match read {
        Ok(existing) => {
            tracing::info!(bucket, key, bytes = existing.len(), "Existing export found");
            Ok(existing)
        }
        Err(err) if err.is_not_found() => {
            tracing::info!(bucket, key, "No existing export, creating new object");
            Ok(String::new())
        }
        Err(err) => Err(read_error(err.to_string())),
    }
}

/// `existing + "\n" + lines.join("\n")`.
///
/// The separator is written even when `existing` is empty, so a first export starts
/// with a blank line. Nothing is deduplicated: overlapping windows repeat lines.
pub fn merge(existing: &str, new_lines: &[String]) -> String {
    let new_len: usize = new_lines.iter().map(|l| l.len() + 1).sum();
    let mut merged = String::with_capacity(existing.len() + new_len + 1);
    merged.push_str(existing);
    merged.push('\n');
    merged.push_str(&new_lines.join("\n"));
    merged
}

/// Read the current object and append `new_lines` to it.
pub async fn accumulate(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
    new_lines: &[String],
    call_timeout: Duration,
) -> Result<String, ExportError> {
    let existing = read_existing(store, bucket, key, call_timeout).await?;
    Ok(merge(&existing, new_lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryBlobStore;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_onto_existing() {
        assert_eq!(merge("A", &lines(&["B"])), "A\nB");
        assert_eq!(merge("A\nB", &lines(&["C", "D"])), "A\nB\nC\nD");
    }

    #[test]
    fn merge_onto_empty_keeps_leading_blank_line() {
        assert_eq!(merge("", &lines(&["x", "y"])), "\nx\ny");
    }

    #[test]
    fn merge_without_new_lines_still_appends_separator() {
        assert_eq!(merge("A", &[]), "A\n");
    }

    #[tokio::test]
    async fn absent_object_reads_as_empty() {
        let store = InMemoryBlobStore::new();
        let merged = accumulate(&store, "b", "k", &lines(&["B"]), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(merged, "\nB");
    }

    #[tokio::test]
    async fn read_failure_is_not_absence() {
        let store = InMemoryBlobStore::new();
        store.insert("b", "k", "history");
        store.fail_reads("b", "k", "AccessDenied");

        let err = accumulate(&store, "b", "k", &lines(&["B"]), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::DestinationRead { .. }));
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn undecodable_object_is_a_read_error() {
        let store = InMemoryBlobStore::new();
        store.insert("b", "k", "history");
        store.corrupt("b", "k");

        let err = read_existing(&store, "b", "k", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "DESTINATION_READ_ERROR");
    }
}
