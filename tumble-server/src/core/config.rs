//! Server configuration
//!
//! All settings come from environment variables with sensible
//! defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | LOG_DIR | (unset) | daily-rolling log files when set |
//! | OPS_EMAIL | ops@tumble.example | internal new-order notices |
//! | RATE_LIMIT_MAX | 10 | order creations per window per client |
//! | RATE_LIMIT_WINDOW_SECS | 3600 | rate-limit window |

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Directory for rolling log files; stdout only when unset
    pub log_dir: Option<String>,
    /// Inbox for internal new-order notices
    pub ops_email: String,
    /// Max order creations per client per window
    pub rate_limit_max: u32,
    /// Rate-limit window length in seconds
    pub rate_limit_window_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            ops_email: std::env::var("OPS_EMAIL")
                .unwrap_or_else(|_| "ops@tumble.example".into()),
            rate_limit_max: std::env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rate_limit_window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
