//! # Process Configuration
//!
//! Everything the API process reads from its environment, resolved once at
//! startup. Values that fail to parse fall back to their defaults with a
//! warning rather than aborting the process.

use dispatch_core::config::{DEFAULT_REJECT_REASON_MIN_LEN, DEFAULT_SLA_TIMEOUT_MINUTES};
use dispatch_engine::DispatchPolicy;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled and every
    /// caller is treated as an admin.
    pub auth_token: Option<String>,
    /// Postgres connection string. If `None`, state lives in memory only.
    pub database_url: Option<String>,
    /// Seed for the `sla_timeout_minutes` configuration key.
    pub sla_timeout_minutes: i64,
    /// Minimum rejection reason length.
    pub reject_reason_min_len: usize,
    /// Whether revert and reopen need a note.
    pub require_reversal_note: bool,
    pub log_format: LogFormat,
    /// Serve `/metrics`.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sla_timeout_minutes", &self.sla_timeout_minutes)
            .field("reject_reason_min_len", &self.reject_reason_min_len)
            .field("require_reversal_note", &self.require_reversal_note)
            .field("log_format", &self.log_format)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            sla_timeout_minutes: DEFAULT_SLA_TIMEOUT_MINUTES,
            reject_reason_min_len: DEFAULT_REJECT_REASON_MIN_LEN,
            require_reversal_note: true,
            log_format: LogFormat::Text,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which returns the raw value
    /// of an environment variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            auth_token: non_blank("AUTH_TOKEN"),
            database_url: non_blank("DATABASE_URL"),
            sla_timeout_minutes: parsed::<i64>(&lookup, "SLA_TIMEOUT_MINUTES")
                .filter(|m| *m > 0)
                .unwrap_or(defaults.sla_timeout_minutes),
            reject_reason_min_len: parsed(&lookup, "REJECT_REASON_MIN_LEN")
                .unwrap_or(defaults.reject_reason_min_len),
            require_reversal_note: flag(&lookup, "REQUIRE_REVERSAL_NOTE")
                .unwrap_or(defaults.require_reversal_note),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            metrics_enabled: flag(&lookup, "METRICS_ENABLED").unwrap_or(defaults.metrics_enabled),
        }
    }

    /// The coordinator policy derived from this configuration.
    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            reject_reason_min_len: self.reject_reason_min_len,
            require_reversal_note: self.require_reversal_note,
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparseable flag");
            None
        }
    }
}
