use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::error::ExportError;
use super::plan::ExportMode;
use super::types::{ExportOutcome, ExportResult, TimeWindow};

/// Aggregate of one export run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub run_id: String,
    pub mode: ExportMode,
    pub bucket: String,
    pub region: String,
    pub hours: i64,
    pub window: TimeWindow,
    pub results: Vec<ExportResult>,
}

impl ExportReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn success_messages(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                ExportOutcome::Success { message, .. } => Some(message.clone()),
                ExportOutcome::Failure { .. } => None,
            })
            .collect()
    }

    pub fn processed_groups(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|r| r.target.log_group_name.clone())
            .collect()
    }

    pub fn into_response_envelope(self) -> ExportResponse {
        let mut body = ResponseBody {
            run_id: Some(self.run_id.clone()),
            bucket: Some(self.bucket.clone()),
            hours: Some(self.hours),
            ..ResponseBody::default()
        };

        let all_failed = !self.results.is_empty() && self.succeeded() == 0;
        match self.mode {
            ExportMode::Single => match self.results.first().map(|r| &r.outcome) {
                Some(ExportOutcome::Success { message, .. }) => body.message = Some(message.clone()),
                Some(ExportOutcome::Failure { reason, .. }) => body.error = Some(reason.clone()),
                None => {}
            },
            ExportMode::Discover | ExportMode::Fixed => {
                body.messages = Some(self.success_messages());
                if self.mode == ExportMode::Discover {
                    body.processed_groups = Some(self.processed_groups());
                }
                if all_failed {
                    body.error = Some(format!("all {} targets failed", self.results.len()));
                }
            }
        }

        body.results = Some(self.results);
        ExportResponse {
            status_code: if all_failed { 500 } else { 200 },
            body,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ExportResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{ statusCode, body }` envelope returned to the trigger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl ExportResponse {
    /// A run that aborted before processing any target.
    pub fn aborted(err: &ExportError) -> Self {
        Self {
            status_code: 500,
            body: ResponseBody {
                error: Some(err.to_string()),
                ..ResponseBody::default()
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

impl From<Result<ExportReport, ExportError>> for ExportResponse {
    fn from(value: Result<ExportReport, ExportError>) -> Self {
        match value {
            Ok(report) => report.into_response_envelope(),
            Err(err) => Self::aborted(&err),
        }
    }
}

impl IntoResponse for ExportResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportTarget;

    fn result(group: &str, ok: bool) -> ExportResult {
        ExportResult {
            target: ExportTarget::new(group, format!("exported-logs/{group}.txt")),
            outcome: if ok {
                ExportOutcome::Success {
                    message: format!("Uploaded logs for {group}"),
                    events: 3,
                }
            } else {
                ExportOutcome::Failure {
                    kind: "SOURCE_QUERY_ERROR".to_string(),
                    reason: "AccessDeniedException".to_string(),
                }
            },
        }
    }

    fn report(mode: ExportMode, results: Vec<ExportResult>) -> ExportReport {
        ExportReport {
            run_id: "run".to_string(),
            mode,
            bucket: "bucket".to_string(),
            region: "us-east-1".to_string(),
            hours: 24,
            window: TimeWindow {
                start_millis: 0,
                end_millis: 86_400_000,
            },
            results,
        }
    }

    #[test]
    fn partial_success_is_200_and_lists_everything() {
        let response = report(
            ExportMode::Discover,
            vec![result("a", true), result("b", false)],
        )
        .into_response_envelope();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.messages.as_ref().unwrap().len(), 1);
        assert_eq!(
            response.body.processed_groups.as_deref(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(response.body.results.as_ref().unwrap().len(), 2);
        assert!(response.body.error.is_none());
    }

    #[test]
    fn all_failed_is_500() {
        let response =
            report(ExportMode::Fixed, vec![result("a", false), result("b", false)])
                .into_response_envelope();
        assert_eq!(response.status_code, 500);
        assert!(response.body.processed_groups.is_none());
        assert_eq!(response.body.error.as_deref(), Some("all 2 targets failed"));
    }

    #[test]
    fn single_failure_surfaces_reason() {
        let response =
            report(ExportMode::Single, vec![result("a", false)]).into_response_envelope();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body.error.as_deref(), Some("AccessDeniedException"));
        assert!(response.body.message.is_none());
    }

    #[test]
    fn empty_discovery_is_success() {
        let response = report(ExportMode::Discover, vec![]).into_response_envelope();
        assert!(response.is_success());
    }

    #[test]
    fn serialized_shape() {
        let response = report(ExportMode::Single, vec![result("a", true)]).into_response_envelope();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"]["message"], "Uploaded logs for a");
        assert_eq!(json["body"]["results"][0]["status"], "success");
        assert_eq!(json["body"]["results"][0]["logGroupName"], "a");
        assert!(json["body"].get("error").is_none());
    }

    #[test]
    fn aborted_run_has_only_error() {
        let response: ExportResponse =
            Err::<ExportReport, _>(ExportError::Discovery("throttled".to_string())).into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusCode"], 500);
        assert_eq!(
            json["body"]["error"],
            "log group discovery failed: throttled"
        );
        assert!(json["body"].get("results").is_none());
    }
}
