use regex::Regex;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{NetworkConfig, Reachability};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Lightweight HTTP access used before a download starts: short-link
/// resolution and reachability probes. Never downloads media bodies.
#[derive(Clone)]
pub struct HttpClient {
    config: NetworkConfig,
    short_links: Vec<Regex>,
}

impl HttpClient {
    pub fn new(config: NetworkConfig) -> Self {
        let short_links = config
            .short_link_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(%pattern, error = %e, "Ignoring invalid short-link pattern");
                    None
                }
            })
            .collect();

        Self {
            config,
            short_links,
        }
    }

    fn client(&self) -> Result<Client> {
        let client = Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .timeout(self.config.timeout())
            .build()?;
        Ok(client)
    }

    pub fn is_short_link(&self, url: &str) -> bool {
        self.short_links.iter().any(|re| re.is_match(url))
    }

    async fn follow_redirects(&self, url: &str) -> Result<String> {
        let response = self.client()?.get(url).send().await?;
        Ok(response.url().to_string())
    }

    async fn head_status(&self, url: &str) -> Result<StatusCode> {
        let response = self.client()?.head(url).send().await?;
        Ok(response.status())
    }

    /// Returns the canonical URL for short links, or `url` unchanged.
    /// Never fails: network problems fall back to the input.
    pub async fn resolve(&self, url: &str) -> String {
        if !self.is_short_link(url) {
            return url.to_string();
        }

        match self.follow_redirects(url).await {
            Ok(resolved) => {
                info!(from = %url, to = %resolved, "Resolved short link");
                resolved
            }
            Err(e) => {
                warn!(%url, error = %e, "Error resolving short link, using it as-is");
                url.to_string()
            }
        }
    }

    /// Header-only existence probe, applied after short-link resolution.
    pub async fn check_reachability(&self, url: &str) -> Reachability {
        let target = self.resolve(url).await;

        let result = match self.head_status(&target).await {
            Ok(status) if status.is_success() => Reachability::Reachable,
            Ok(status) => Reachability::HttpError {
                status: status.as_u16(),
            },
            Err(e) => Reachability::NetworkError {
                message: e.to_string(),
            },
        };
        debug!(url = %target, ?result, "Reachability check finished");
        result
    }
}
