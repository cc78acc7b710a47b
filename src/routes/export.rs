use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::export::window::select_window;
use crate::export::{
    ExportMode, ExportRequest, ExportResponse, ExportTarget, TargetSpec, TimeWindow,
};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(trigger_export))
        .route("/preview", post(preview_export))
        .route("/last", get(last_report))
}

/// An empty body means "use the configured defaults".
fn parse_request(body: &Bytes) -> Result<ExportRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExportRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        AppError::bad_request("INVALID_REQUEST", &format!("invalid export request: {e}"))
    })
}

async fn trigger_export(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ExportResponse, AppError> {
    let request = parse_request(&body)?;
    tracing::info!(?request, "Export triggered over HTTP");
    Ok(state.run_export(request).await)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportPreview {
    mode: ExportMode,
    bucket: String,
    region: String,
    hours: i64,
    window: TimeWindow,
    /// `None` in discover mode: targets are only known after listing groups.
    targets: Option<Vec<ExportTarget>>,
    naming_prefix: Option<String>,
    deny_list_substr: Option<String>,
}

/// Resolve a request without touching either backend.
async fn preview_export(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let plan = parse_request(&body)?.resolve(&state.config().export)?;
    let window = select_window(state.clock().now_millis(), plan.hours)?;

    let (naming_prefix, deny_list_substr) = match &plan.targets {
        TargetSpec::Discover(filter) => (
            Some(filter.prefix.clone()),
            Some(filter.deny_substring.clone()),
        ),
        TargetSpec::Single(_) | TargetSpec::Fixed(_) => (None, None),
    };

    Ok(ok(ExportPreview {
        mode: plan.mode(),
        bucket: plan.bucket.clone(),
        region: plan.region.clone(),
        hours: plan.hours,
        window,
        targets: plan.targets.static_targets(),
        naming_prefix,
        deny_list_substr,
    }))
}

async fn last_report(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let report = state
        .last_report()
        .await
        .ok_or_else(|| AppError::not_found("No export has completed yet"))?;
    Ok(ok(report))
}
