//! Scheduled export of the configured log groups.

use crate::export::ExportRequest;
use crate::state::AppState;

pub async fn run(state: &AppState) {
    tracing::info!("Log export worker tick");

    let report = match state.execute_export(ExportRequest::default()).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "Scheduled log export aborted");
            return;
        }
    };

    if report.failed() > 0 {
        tracing::warn!(
            run_id = %report.run_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Scheduled log export finished with failures"
        );
    } else {
        tracing::info!(
            run_id = %report.run_id,
            succeeded = report.succeeded(),
            "Scheduled log export complete"
        );
    }
}
