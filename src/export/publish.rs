use std::time::Duration;

use super::error::{bounded, ExportError};
use crate::services::blob_store::BlobStore;

/// Replace the object at `key` with `merged`. Last writer wins; no retry.
pub async fn publish(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
    merged: String,
    call_timeout: Duration,
) -> Result<(), ExportError> {
    let write_error = |message: String| ExportError::DestinationWrite {
        key: key.to_string(),
        message,
    };
    let size = merged.len();

    bounded(call_timeout, "put_object", store.put_text(bucket, key, merged))
        .await
        .map_err(|e| write_error(e.to_string()))?
        .map_err(|e| write_error(e.to_string()))?;

    tracing::info!(bucket, key, bytes = size, "Published export");
    Ok(())
}
