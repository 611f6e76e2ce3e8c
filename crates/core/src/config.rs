use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub source: SourceConfig,
    pub postgres: PostgresConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `APOD_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("APOD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            source: SourceConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  source:      url={}, api_key={}",
            self.source.endpoint_url(),
            if self.source.uses_demo_key() { "DEMO_KEY" } else { "(set)" }
        );
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!(
            "  schedule:    cron={}, verify_limit={}",
            self.schedule.cron,
            self.schedule.verify_limit
        );
    }

    /// Return a redacted view safe for logs and reports (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "source": {
                "url": self.source.endpoint_url(),
                "timeout_secs": self.source.timeout_secs,
                "demo_key": self.source.uses_demo_key(),
            },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "configured": self.postgres.is_configured(),
            },
            "schedule": {
                "cron": self.schedule.cron,
                "verify_limit": self.schedule.verify_limit,
            },
        })
    }
}

// ── APOD source ───────────────────────────────────────────────

pub const DEMO_API_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    /// Path below `base_url`, without a leading slash.
    pub endpoint: String,
    pub api_key: String,
    /// Client-side request timeout.
    pub timeout_secs: u64,
}

impl SourceConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            base_url: profiled_env_or(p, "APOD_BASE_URL", "https://api.nasa.gov"),
            endpoint: profiled_env_or(p, "APOD_ENDPOINT", "planetary/apod"),
            api_key: profiled_env_or(p, "APOD_API_KEY", DEMO_API_KEY),
            timeout_secs: profiled_env_u64(p, "APOD_HTTP_TIMEOUT_SECS", 30),
        }
    }

    /// Full endpoint URL with exactly one slash between base and path.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }

    pub fn uses_demo_key(&self) -> bool {
        self.api_key == DEMO_API_KEY
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; overrides the individual parts when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "PG_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "apod"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 5),
        }
    }

    /// Login role, `postgres` when unset.
    pub fn username_or_default(&self) -> &str {
        self.username.as_deref().unwrap_or("postgres")
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── Schedule ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 5- or 6-field cron expression, evaluated in UTC.
    pub cron: String,
    /// Rows read back after each insert.
    pub verify_limit: u32,
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            cron: profiled_env_or(p, "APOD_SCHEDULE_CRON", "0 0 * * *"),
            verify_limit: profiled_env_u32(p, "APOD_VERIFY_LIMIT", 5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str, endpoint: &str) -> SourceConfig {
        SourceConfig {
            base_url: base_url.to_string(),
            endpoint: endpoint.to_string(),
            api_key: DEMO_API_KEY.to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn endpoint_url_joins_with_single_slash() {
        assert_eq!(
            source("https://api.nasa.gov", "planetary/apod").endpoint_url(),
            "https://api.nasa.gov/planetary/apod"
        );
        assert_eq!(
            source("https://api.nasa.gov/", "/planetary/apod").endpoint_url(),
            "https://api.nasa.gov/planetary/apod"
        );
    }

    #[test]
    fn username_defaults_to_postgres() {
        let mut pg = PostgresConfig {
            url: None,
            host: "db".to_string(),
            port: 5433,
            database: "apod".to_string(),
            username: None,
            password: None,
            ssl_mode: "disable".to_string(),
            max_connections: 5,
        };
        assert_eq!(pg.username_or_default(), "postgres");
        assert!(!pg.is_configured());

        pg.username = Some("airflow".to_string());
        assert_eq!(pg.username_or_default(), "airflow");
        assert!(pg.is_configured());
    }

    #[test]
    fn redacted_summary_has_no_secrets() {
        let config = Config {
            profile: String::new(),
            source: SourceConfig {
                api_key: "super-secret-key".to_string(),
                ..source("https://api.nasa.gov", "planetary/apod")
            },
            postgres: PostgresConfig {
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                database: "apod".to_string(),
                username: Some("postgres".to_string()),
                password: Some("hunter2".to_string()),
                ssl_mode: "prefer".to_string(),
                max_connections: 5,
            },
            schedule: ScheduleConfig {
                cron: "0 0 * * *".to_string(),
                verify_limit: 5,
            },
        };

        let text = config.redacted_summary().to_string();
        assert!(!text.contains("super-secret-key"));
        assert!(!text.contains("hunter2"));
        assert_eq!(config.profile_label(), "default");
    }
}
