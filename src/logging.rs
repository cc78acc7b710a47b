use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "log-export-backend";
const MAX_LOG_FILES: usize = 30;

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

fn rolling_appender(log_dir: &str) -> Result<RollingFileAppender, String> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| e.to_string())
}

/// A second install attempt (tests, repeated init) is not an error.
fn report_init(result: Result<(), TryInitError>) {
    if let Err(e) = result {
        let msg = e.to_string();
        if !msg.contains("already been set") {
            eprintln!("failed to initialize tracing: {msg}");
        }
    }
}

/// Install the global subscriber: stdout always, daily rolling JSON files when
/// `enable_file_logs` is set. An unusable log directory falls back to stdout only.
pub fn init_tracing(config: &Config) {
    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);
    let registry = Registry::default()
        .with(env_filter(config))
        .with(stdout_layer);

    if !config.enable_file_logs {
        report_init(registry.try_init());
        return;
    }

    match rolling_appender(&config.log_dir) {
        Ok(appender) => {
            let file_layer = fmt::layer().with_writer(appender).with_ansi(false).json();
            report_init(registry.with(file_layer).try_init());
            tracing::info!(log_dir = %config.log_dir, "File logging enabled");
        }
        Err(error) => {
            report_init(registry.try_init());
            tracing::warn!(log_dir = %config.log_dir, %error, "File logging disabled");
        }
    }
}
