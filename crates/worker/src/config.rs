use std::time::Duration;

use tenantry_events::bus::DEFAULT_CAPACITY;

const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Worker configuration loaded from environment variables.
///
/// Every field has a default suitable for local development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Seconds between reminder/overdue scans (default: `3600`).
    pub reminder_scan_interval_secs: u64,
    /// Broadcast buffer size of the event bus (default: `1024`).
    pub event_bus_capacity: usize,
    pub log_format: LogFormat,
    /// Variables that were set but could not be parsed. Logged by `main`
    /// once tracing is up.
    pub rejected: Vec<String>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `REMINDER_SCAN_INTERVAL_SECS` | `3600`  |
    /// | `EVENT_BUS_CAPACITY`          | `1024`  |
    /// | `LOG_FORMAT`                  | `text`  |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from any source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut rejected = Vec::new();

        let reminder_scan_interval_secs = parse_or(
            &lookup,
            "REMINDER_SCAN_INTERVAL_SECS",
            DEFAULT_SCAN_INTERVAL_SECS,
            &mut rejected,
        )
        .max(1);

        let event_bus_capacity = parse_or(
            &lookup,
            "EVENT_BUS_CAPACITY",
            DEFAULT_CAPACITY,
            &mut rejected,
        )
        .max(1);

        let log_format = match lookup("LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v == "text" || v.is_empty() => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                rejected.push(format!("LOG_FORMAT={v}"));
                LogFormat::Text
            }
        };

        Self {
            reminder_scan_interval_secs,
            event_bus_capacity,
            log_format,
            rejected,
        }
    }

    pub fn reminder_scan_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_scan_interval_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    rejected: &mut Vec<String>,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            rejected.push(format!("{key}={raw}"));
            default
        }),
    }
}
