use anyhow::{bail, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Client settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub export_timeout_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub health_poll_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            export_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 1_000,
            health_poll_secs: 30,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let base_url = std::env::var("API_URL")
            .or_else(|_| std::env::var("REACT_APP_API_URL"))
            .unwrap_or(d.base_url);
        Self {
            base_url: normalize_base(&base_url),
            timeout_ms: std::env::var("API_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.timeout_ms),
            export_timeout_ms: std::env::var("EXPORT_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.export_timeout_ms),
            retry_max_attempts: std::env::var("RETRY_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.retry_max_attempts),
            retry_initial_delay_ms: std::env::var("RETRY_INITIAL_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.retry_initial_delay_ms),
            health_poll_secs: std::env::var("HEALTH_POLL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.health_poll_secs),
        }
    }

    /// Same settings pointed at another backend.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base(base_url);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let url = match Url::parse(&self.base_url) {
            Ok(u) => u,
            Err(e) => bail!("invalid API base url '{}': {}", self.base_url, e),
        };
        if !matches!(url.scheme(), "http" | "https") {
            bail!("API base url must be http or https, got '{}'", url.scheme());
        }
        if self.timeout_ms == 0 || self.export_timeout_ms == 0 {
            bail!("request timeouts must be non-zero");
        }
        Ok(())
    }
}

fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
