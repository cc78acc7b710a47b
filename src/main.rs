use std::net::SocketAddr;
use std::sync::Arc;

use log_export_backend::clock::SystemClock;
use log_export_backend::config::{BackendKind, Config};
use log_export_backend::logging::init_tracing;
use log_export_backend::routes::build_router;
use log_export_backend::services::BackendRegistry;
use log_export_backend::state::AppState;
use log_export_backend::workers::WorkerManager;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&config);
    tracing::info!(
        backend = ?config.backend,
        region = %config.export.region,
        mode = %config.export.mode,
        "Starting log-export-backend"
    );

    let backends = match config.backend {
        BackendKind::Aws => BackendRegistry::aws(config.aws_endpoint.clone()),
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backends; nothing is read from or written to AWS");
            BackendRegistry::local(&config.export)
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(
        &config,
        backends,
        Arc::new(SystemClock),
        shutdown_tx.clone(),
    );

    let worker_handle = if config.worker.is_leader {
        let worker_manager =
            WorkerManager::new(state.clone(), state.shutdown_rx(), &config.worker);
        Some(tokio::spawn(async move {
            if let Err(e) = worker_manager.start().await {
                tracing::error!(error = %e, "Worker manager failed");
            }
        }))
    } else {
        None
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new());

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    let server_future = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Some(handle) = worker_handle {
        // A worker panic is logged and the HTTP server keeps serving.
        tokio::spawn(async move {
            match handle.await {
                Err(e) => {
                    tracing::error!(error = %e, "Worker task panicked, HTTP server continues")
                }
                Ok(()) => tracing::info!("Worker manager exited normally"),
            }
        });
    }

    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
