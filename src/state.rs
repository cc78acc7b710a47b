use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, RwLock};

use crate::clock::Clock;
use crate::config::Config;
use crate::export::{
    ExportError, ExportReport, ExportRequest, ExportResponse, ExportSettings, Exporter,
};
use crate::services::BackendRegistry;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    backends: Arc<BackendRegistry>,
    clock: Arc<dyn Clock>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
    last_report: Arc<RwLock<Option<ExportReport>>>,
}

impl AppState {
    pub fn new(
        config: &Config,
        backends: BackendRegistry,
        clock: Arc<dyn Clock>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            config: Arc::new(config.clone()),
            backends: Arc::new(backends),
            clock,
            shutdown_tx,
            started_at: Instant::now(),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub async fn last_report(&self) -> Option<ExportReport> {
        self.last_report.read().await.clone()
    }

    /// Resolve, run and record one export. Shared by the HTTP trigger and the scheduler.
    ///
    /// `Err` means the run aborted before processing any target; nothing is recorded then.
    pub async fn execute_export(
        &self,
        request: ExportRequest,
    ) -> Result<ExportReport, ExportError> {
        let plan = request.resolve(&self.config.export).inspect_err(|err| {
            tracing::error!(error = %err, "Rejected export request");
        })?;

        let backends = self.backends.for_region(&plan.region).await;
        let exporter = Exporter::new(
            backends,
            self.clock.clone(),
            ExportSettings::from_config(&self.config.export),
        );

        let report = exporter.run(&plan).await.inspect_err(|err| {
            tracing::error!(kind = err.kind(), error = %err, "Export run aborted");
        })?;
        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// [`execute_export`](Self::execute_export) rendered as the `{statusCode, body}` envelope.
    pub async fn run_export(&self, request: ExportRequest) -> ExportResponse {
        ExportResponse::from(self.execute_export(request).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::clock::FixedClock;
    use crate::export::LogEvent;
    use crate::services::memory::{InMemoryBlobStore, InMemoryLogSource};

    fn memory_state() -> (AppState, Arc<InMemoryLogSource>, Arc<InMemoryBlobStore>) {
        let source = Arc::new(InMemoryLogSource::new());
        let store = Arc::new(InMemoryBlobStore::new());
        let (tx, _) = broadcast::channel(4);
        let state = AppState::new(
            &Config::default(),
            BackendRegistry::memory(source.clone(), store.clone()),
            Arc::new(FixedClock::new(1_709_294_400_000)),
            tx,
        );
        (state, source, store)
    }

    #[tokio::test]
    async fn successful_run_is_recorded() {
        let (state, source, _store) = memory_state();
        source.push_page(
            "/aws/lambda/orders",
            vec![LogEvent {
                timestamp_millis: 1_709_294_000_000,
                message: "ok".to_string(),
            }],
        );

        assert!(state.last_report().await.is_none());
        let response = state
            .run_export(ExportRequest {
                log_group_name: Some("/aws/lambda/orders".to_string()),
                destination_key: Some("exported-logs/orders.txt".to_string()),
                bucket: Some("bucket".to_string()),
                hours: Some(1),
                ..Default::default()
            })
            .await;
        assert!(response.is_success());

        let report = state.last_report().await.expect("report recorded");
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn rejected_request_is_not_recorded() {
        let (state, _source, store) = memory_state();
        let response = state
            .run_export(ExportRequest {
                hours: Some(0),
                bucket: Some("bucket".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(response.status_code, 500);
        assert!(response.body.error.unwrap().contains("lookback hours"));
        assert!(state.last_report().await.is_none());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn executed_report_is_the_one_returned() {
        let (state, source, _store) = memory_state();
        source.add_group("/aws/lambda/site");

        let first = state.execute_export(ExportRequest::default()).await.unwrap();
        let second = state.execute_export(ExportRequest::default()).await.unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(state.last_report().await.unwrap().run_id, second.run_id);
    }

    #[tokio::test]
    async fn shutdown_receiver_can_clone() {
        let (state, _, _) = memory_state();
        let mut rx1 = state.shutdown_rx();
        let mut rx2 = state.shutdown_rx();
        state.shutdown_tx().send(()).unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }
}
