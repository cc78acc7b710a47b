pub mod log_export;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::{ExportConfig, WorkerConfig};
use crate::state::AppState;

/// Used when the export run itself has no deadline.
const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Slack on top of the run deadline so in-flight targets can finish.
const WORKER_TIMEOUT_MARGIN: Duration = Duration::from_secs(60);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    LogExport,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogExport => "log_export",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: String,
    pub enabled: bool,
}

pub fn worker_timeout(export: &ExportConfig) -> Duration {
    match export.run_timeout_secs {
        0 => DEFAULT_WORKER_TIMEOUT,
        secs => Duration::from_secs(secs) + WORKER_TIMEOUT_MARGIN,
    }
}

pub struct WorkerManager {
    state: AppState,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(state: AppState, shutdown_rx: broadcast::Receiver<()>, config: &WorkerConfig) -> Self {
        Self {
            state,
            shutdown_rx,
            config: config.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![JobSpec {
            name: WorkerName::LogExport,
            cron: self.config.export_cron.clone(),
            enabled: self.config.enable_scheduled_export,
        }]
    }

    /// Start the worker scheduler. Returns an error if the scheduler cannot be created or started.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in &self.planned_jobs() {
            if !spec.enabled {
                tracing::info!(name = spec.name.as_str(), "Skipping disabled worker");
                continue;
            }

            let name_str = spec.name.as_str();
            match spec.name {
                WorkerName::LogExport => {
                    let state = self.state.clone();
                    let timeout = worker_timeout(&state.config().export);
                    add_job(scheduler, &spec.cron, name_str, timeout, move || {
                        let state = state.clone();
                        async move {
                            log_export::run(&state).await;
                        }
                    })
                    .await;
                }
            }
            tracing::info!(name = name_str, cron = %spec.cron, "Registered worker");
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(
    scheduler: &JobScheduler,
    cron: &str,
    name: &'static str,
    timeout: Duration,
    mut run: F,
) where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(timeout, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = timeout.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error=%err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error=%err, cron, worker = name, "Failed to create worker job"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use crate::services::memory::{InMemoryBlobStore, InMemoryLogSource};
    use crate::services::BackendRegistry;

    fn manager(worker: WorkerConfig) -> WorkerManager {
        let config = Config::default();
        let (tx, _) = broadcast::channel(2);
        let state = AppState::new(
            &config,
            BackendRegistry::memory(
                Arc::new(InMemoryLogSource::new()),
                Arc::new(InMemoryBlobStore::new()),
            ),
            Arc::new(FixedClock::new(0)),
            tx.clone(),
        );
        WorkerManager::new(state, tx.subscribe(), &worker)
    }

    fn worker_config(is_leader: bool, enabled: bool) -> WorkerConfig {
        WorkerConfig {
            is_leader,
            enable_scheduled_export: enabled,
            export_cron: "0 0 0 * * *".to_string(),
        }
    }

    #[tokio::test]
    async fn leader_switch_controls_job_registration() {
        let manager = manager(worker_config(false, true));
        assert!(manager.planned_jobs().is_empty());
    }

    #[tokio::test]
    async fn shutdown_path_is_non_panicking() {
        let manager = manager(worker_config(false, true));
        manager
            .start()
            .await
            .expect("non-leader start should succeed");
    }

    #[tokio::test]
    async fn scheduled_export_flag_is_respected() {
        let jobs = manager(worker_config(true, false)).planned_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, WorkerName::LogExport);
        assert_eq!(jobs[0].cron, "0 0 0 * * *");
        assert!(!jobs[0].enabled);
    }

    #[tokio::test]
    async fn leader_drains_after_shutdown_signal() {
        let manager = manager(worker_config(true, true));
        let tx = manager.state.shutdown_tx().clone();
        let handle = tokio::spawn(manager.start());
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();
        handle.await.unwrap().expect("scheduler shuts down cleanly");
    }

    #[test]
    fn timeout_follows_run_deadline() {
        let mut export = ExportConfig::default();
        assert_eq!(worker_timeout(&export), Duration::from_secs(300));
        export.run_timeout_secs = 0;
        assert_eq!(worker_timeout(&export), DEFAULT_WORKER_TIMEOUT);
        export.run_timeout_secs = 600;
        assert_eq!(worker_timeout(&export), Duration::from_secs(660));
    }

    #[test]
    fn all_worker_names_have_str() {
        assert_eq!(WorkerName::LogExport.as_str(), "log_export");
    }
}
