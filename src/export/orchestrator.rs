use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::Instrument;

use super::accumulate::accumulate;
use super::discover::discover_groups;
use super::error::ExportError;
use super::fetch::fetch_events;
use super::format::format_events;
use super::plan::{ExportPlan, TargetSpec};
use super::publish::publish;
use super::report::ExportReport;
use super::target::{destination_key, KeyStyle};
use super::types::{ExportOutcome, ExportResult, ExportTarget, TimeWindow};
use super::window::select_window;
use crate::clock::Clock;
use crate::config::ExportConfig;
use crate::constants::MAX_FILTER_PAGE_LIMIT;
use crate::services::blob_store::BlobStore;
use crate::services::log_source::LogSource;
use crate::services::Backends;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub page_limit: i32,
    /// Bound on each individual service call.
    pub call_timeout: Duration,
    /// Targets not started by this deadline are reported as failed.
    pub run_timeout: Option<Duration>,
    pub concurrency: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_limit: MAX_FILTER_PAGE_LIMIT,
            call_timeout: Duration::from_secs(30),
            run_timeout: None,
            concurrency: 1,
        }
    }
}

impl ExportSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            page_limit: config.page_limit.clamp(1, MAX_FILTER_PAGE_LIMIT),
            call_timeout: Duration::from_secs(config.call_timeout_secs.max(1)),
            run_timeout: (config.run_timeout_secs > 0)
                .then(|| Duration::from_secs(config.run_timeout_secs)),
            concurrency: config.concurrency.max(1),
        }
    }
}

/// Drives Fetch -> Format -> Accumulate -> Publish for every target of a plan.
pub struct Exporter {
    source: Arc<dyn LogSource>,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    settings: ExportSettings,
}

impl Exporter {
    pub fn new(backends: Backends, clock: Arc<dyn Clock>, settings: ExportSettings) -> Self {
        Self {
            source: backends.source,
            store: backends.store,
            clock,
            settings,
        }
    }

    /// Run a whole export. `Err` means the run aborted before any target was processed;
    /// per-target failures are reported inside the returned report.
    pub async fn run(&self, plan: &ExportPlan) -> Result<ExportReport, ExportError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("export_run", run_id = %run_id, mode = %plan.mode());
        self.run_inner(run_id, plan).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: String,
        plan: &ExportPlan,
    ) -> Result<ExportReport, ExportError> {
        let started = Instant::now();
        let window = select_window(self.clock.now_millis(), plan.hours)?;
        let deadline = self.settings.run_timeout.map(|limit| started + limit);

        let targets = self.resolve_targets(&plan.targets).await?;
        tracing::info!(
            targets = targets.len(),
            bucket = %plan.bucket,
            start_millis = window.start_millis,
            end_millis = window.end_millis,
            "Starting export run"
        );

        let results: Vec<ExportResult> = stream::iter(targets)
            .map(|target| self.export_target(target, &plan.bucket, window, deadline))
            .buffered(self.settings.concurrency)
            .collect()
            .await;

        let report = ExportReport {
            run_id,
            mode: plan.mode(),
            bucket: plan.bucket.clone(),
            region: plan.region.clone(),
            hours: plan.hours,
            window,
            results,
        };

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Export run complete"
        );
        Ok(report)
    }

    pub async fn resolve_targets(
        &self,
        spec: &TargetSpec,
    ) -> Result<Vec<ExportTarget>, ExportError> {
        let TargetSpec::Discover(filter) = spec else {
            return Ok(spec.static_targets().unwrap_or_default());
        };

        let groups =
            discover_groups(self.source.as_ref(), filter, self.settings.call_timeout).await?;
        Ok(groups
            .into_iter()
            .map(|group| {
                let key = destination_key(&group, KeyStyle::FunctionName);
                ExportTarget::new(group, key)
            })
            .collect())
    }

    /// Export one target, converting any failure into a failure entry.
    pub async fn export_target(
        &self,
        target: ExportTarget,
        bucket: &str,
        window: TimeWindow,
        deadline: Option<Instant>,
    ) -> ExportResult {
        let span = tracing::info_span!(
            "export_target",
            log_group = %target.log_group_name,
            key = %target.destination_key
        );

        let outcome = async {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ExportError::DeadlineExceeded);
            }
            self.export_one(&target, bucket, window).await
        }
        .instrument(span.clone())
        .await;

        let outcome = span.in_scope(|| match outcome {
            Ok(events) => {
                let message = format!(
                    "Uploaded logs for {} to s3://{}/{}",
                    target.log_group_name, bucket, target.destination_key
                );
                tracing::info!(events, "Target exported");
                ExportOutcome::Success { message, events }
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "Target export failed");
                ExportOutcome::Failure {
                    kind: err.kind().to_string(),
                    reason: err.to_string(),
                }
            }
        });

        ExportResult { target, outcome }
    }

    async fn export_one(
        &self,
        target: &ExportTarget,
        bucket: &str,
        window: TimeWindow,
    ) -> Result<usize, ExportError> {
        let call_timeout = self.settings.call_timeout;

        let events = fetch_events(
            self.source.as_ref(),
            &target.log_group_name,
            window,
            self.settings.page_limit,
            call_timeout,
        )
        .await?;
        let lines = format_events(&events)?;

        let merged = accumulate(
            self.store.as_ref(),
            bucket,
            &target.destination_key,
            &lines,
            call_timeout,
        )
        .await?;
        publish(
            self.store.as_ref(),
            bucket,
            &target.destination_key,
            merged,
            call_timeout,
        )
        .await?;

        Ok(events.len())
    }
}
