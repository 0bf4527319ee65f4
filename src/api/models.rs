use serde::Deserialize;
use std::time::Duration;

/// Upper bound for any outbound probe so a slow host cannot stall the pipeline.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the HTTP client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Regexes matched against the raw URL; a match means "follow redirects first".
    pub short_link_patterns: Vec<String>,
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs).min(MAX_PROBE_TIMEOUT)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
            timeout_secs: 5,
            short_link_patterns: vec![r"^https?://v\.douyin\.com/".to_string()],
        }
    }
}

/// Result of a header-only probe. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    HttpError { status: u16 },
    NetworkError { message: String },
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reachable => write!(f, "✅ URL is reachable"),
            Self::HttpError { status } => write!(f, "⚠️ URL error: {}", status),
            Self::NetworkError { message } => write!(f, "❌ Error: {}", message),
        }
    }
}
