use chrono::{DateTime, Utc};

use super::error::ExportError;
use super::types::LogEvent;

/// Render epoch milliseconds as ISO-8601 UTC with an explicit `+00:00` offset.
///
/// Whole seconds carry no fraction; anything else is printed with microsecond
/// precision, which keeps new lines identical in shape to ones already exported.
pub fn iso_timestamp(timestamp_millis: i64) -> Result<String, ExportError> {
    if timestamp_millis < 0 {
        return Err(ExportError::InvalidTimestamp(timestamp_millis));
    }
    let at = DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .ok_or(ExportError::InvalidTimestamp(timestamp_millis))?;

    let rendered = if timestamp_millis % 1_000 == 0 {
        at.format("%Y-%m-%dT%H:%M:%S+00:00")
    } else {
        at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00")
    };
    Ok(rendered.to_string())
}

/// `[<timestamp>] <message>` with trailing newlines removed. Embedded newlines stay.
pub fn format_event(event: &LogEvent) -> Result<String, ExportError> {
    let timestamp = iso_timestamp(event.timestamp_millis)?;
    Ok(format!(
        "[{timestamp}] {}",
        event.message.trim_end_matches('\n')
    ))
}

pub fn format_events(events: &[LogEvent]) -> Result<Vec<String>, ExportError> {
    events.iter().map(format_event).collect()
}
