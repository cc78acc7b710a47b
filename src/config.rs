use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BUCKET, DEFAULT_DENY_SUBSTRING, DEFAULT_DESTINATION_KEY, DEFAULT_EXPORT_CRON,
    DEFAULT_FIXED_GROUPS, DEFAULT_LOG_GROUP, DEFAULT_LOOKBACK_HOURS, DEFAULT_NAMING_PREFIX,
    DEFAULT_REGION, MAX_FILTER_PAGE_LIMIT,
};
use crate::export::ExportMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub backend: BackendKind,
    pub aws_endpoint: Option<String>,
    pub worker: WorkerConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Aws,
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub enable_scheduled_export: bool,
    pub export_cron: String,
}

/// Defaults for export runs; request fields override them per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub mode: ExportMode,
    pub bucket: String,
    pub region: String,
    pub log_group: String,
    pub destination_key: String,
    pub hours: i64,
    pub naming_prefix: String,
    pub deny_substring: String,
    pub fixed_groups: Vec<String>,
    pub page_limit: i32,
    pub call_timeout_secs: u64,
    pub run_timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: ExportMode::Single,
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            log_group: DEFAULT_LOG_GROUP.to_string(),
            destination_key: DEFAULT_DESTINATION_KEY.to_string(),
            hours: DEFAULT_LOOKBACK_HOURS,
            naming_prefix: DEFAULT_NAMING_PREFIX.to_string(),
            deny_substring: DEFAULT_DENY_SUBSTRING.to_string(),
            fixed_groups: split_list(DEFAULT_FIXED_GROUPS),
            page_limit: MAX_FILTER_PAGE_LIMIT,
            call_timeout_secs: 30,
            run_timeout_secs: 240,
            concurrency: 1,
        }
    }
}

impl Default for Config {
    /// Built-in defaults with no environment lookups.
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
            backend: BackendKind::Aws,
            aws_endpoint: None,
            worker: WorkerConfig {
                is_leader: true,
                enable_scheduled_export: true,
                export_cron: DEFAULT_EXPORT_CRON.to_string(),
            },
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let base = Config::default();
        let defaults = base.export;
        Self {
            host: env_or_parse("HOST", base.host),
            port: env_or_parse("PORT", base.port),
            log_level: env_or("RUST_LOG", &base.log_level),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", base.enable_file_logs),
            log_dir: env_or("LOG_DIR", &base.log_dir),
            backend: env_or_parse("EXPORT_BACKEND", base.backend),
            aws_endpoint: env_opt("AWS_ENDPOINT_URL"),
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", base.worker.is_leader),
                enable_scheduled_export: env_or_bool(
                    "EXPORT_SCHEDULE_ENABLED",
                    base.worker.enable_scheduled_export,
                ),
                export_cron: env_or("EXPORT_CRON", &base.worker.export_cron),
            },
            export: ExportConfig {
                mode: env_or_parse("EXPORT_MODE", defaults.mode),
                bucket: env_or("EXPORT_BUCKET", &defaults.bucket),
                region: env_or("AWS_REGION", &defaults.region),
                log_group: env_or("EXPORT_LOG_GROUP", &defaults.log_group),
                destination_key: env_or("EXPORT_DESTINATION_KEY", &defaults.destination_key),
                hours: env_or_parse("EXPORT_HOURS", defaults.hours),
                naming_prefix: env_or("EXPORT_NAMING_PREFIX", &defaults.naming_prefix),
                deny_substring: env_or("EXPORT_DENY_SUBSTR", &defaults.deny_substring),
                fixed_groups: env_opt("EXPORT_GROUPS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or(defaults.fixed_groups),
                page_limit: env_or_parse("EXPORT_PAGE_LIMIT", defaults.page_limit),
                call_timeout_secs: env_or_parse(
                    "EXPORT_CALL_TIMEOUT_SECS",
                    defaults.call_timeout_secs,
                ),
                run_timeout_secs: env_or_parse(
                    "EXPORT_RUN_TIMEOUT_SECS",
                    defaults.run_timeout_secs,
                ),
                concurrency: env_or_parse("EXPORT_CONCURRENCY", defaults.concurrency),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Comma separated list, blanks dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
