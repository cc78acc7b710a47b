use super::error::ExportError;
use super::types::TimeWindow;
use crate::constants::MILLIS_PER_HOUR;

/// Window of `hours` ending at `now_millis`.
pub fn select_window(now_millis: i64, hours: i64) -> Result<TimeWindow, ExportError> {
    if hours <= 0 {
        return Err(ExportError::config(format!(
            "lookback hours must be positive, got {hours}"
        )));
    }

    let span = hours
        .checked_mul(MILLIS_PER_HOUR)
        .ok_or_else(|| ExportError::config(format!("lookback of {hours} hours overflows")))?;
    let start_millis = now_millis
        .checked_sub(span)
        .ok_or_else(|| ExportError::config(format!("lookback of {hours} hours overflows")))?;

    Ok(TimeWindow {
        start_millis,
        end_millis: now_millis,
    })
}
