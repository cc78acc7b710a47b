use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;

use log_export_backend::clock::FixedClock;
use log_export_backend::config::{BackendKind, Config, ExportConfig, WorkerConfig};
use log_export_backend::export::LogEvent;
use log_export_backend::routes::build_router;
use log_export_backend::services::memory::{InMemoryBlobStore, InMemoryLogSource};
use log_export_backend::services::BackendRegistry;
use log_export_backend::state::AppState;

/// 2024-03-01T12:00:00Z
pub const NOW_MILLIS: i64 = 1_709_294_400_000;
pub const HOUR_MILLIS: i64 = 3_600_000;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub source: Arc<InMemoryLogSource>,
    pub store: Arc<InMemoryBlobStore>,
    pub clock: Arc<FixedClock>,
}

pub fn test_config(export: ExportConfig) -> Config {
    // Built directly so parallel tests never race on process env vars.
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        backend: BackendKind::Memory,
        aws_endpoint: None,
        worker: WorkerConfig {
            is_leader: false,
            enable_scheduled_export: false,
            export_cron: "0 0 0 * * *".to_string(),
        },
        export,
    }
}

pub fn spawn_with_export(export: ExportConfig) -> TestApp {
    let config = test_config(export);
    let source = Arc::new(InMemoryLogSource::new());
    let store = Arc::new(InMemoryBlobStore::new());
    let clock = Arc::new(FixedClock::new(NOW_MILLIS));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(
        &config,
        BackendRegistry::memory(source.clone(), store.clone()),
        clock.clone(),
        shutdown_tx,
    );
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        source,
        store,
        clock,
    }
}

pub fn spawn_test_server() -> TestApp {
    spawn_with_export(ExportConfig::default())
}

pub fn event(timestamp_millis: i64, message: &str) -> LogEvent {
    LogEvent {
        timestamp_millis,
        message: message.to_string(),
    }
}
