use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::api::NetworkConfig;
use crate::domain::AppError;

const APP_DIR: &str = "universal-video-downloader";
const CONFIG_FILE: &str = "config.json";

/// Settings for the external fetch/transcode tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ytdlp_binary: PathBuf,
    pub transcoder_binary: String,
    pub audio_bitrate_kbps: u32,
    pub merge_container: String,
    pub prefer_m4a_audio: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_binary: PathBuf::from("yt-dlp"),
            transcoder_binary: "ffmpeg".to_string(),
            audio_bitrate_kbps: 320,
            merge_container: "mp4".to_string(),
            prefer_m4a_audio: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub engine: EngineConfig,
    pub default_destination: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            engine: EngineConfig::default(),
            default_destination: dirs::download_dir(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        serde_json::from_str(json).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Defaults, then the optional config file, then environment overrides.
    pub fn load() -> Self {
        let mut config = match dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE)) {
            Some(path) if path.exists() => Self::from_file(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                Self::default()
            }),
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Io(e.to_string()))?;
        let config = Self::from_json(&raw)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(ytdlp) = var("UVD_YTDLP").filter(|v| !v.is_empty()) {
            self.engine.ytdlp_binary = PathBuf::from(ytdlp);
        }
        if let Some(ffmpeg) = var("UVD_FFMPEG").filter(|v| !v.is_empty()) {
            self.engine.transcoder_binary = ffmpeg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.audio_bitrate_kbps, 320);
        assert_eq!(config.engine.merge_container, "mp4");
        assert_eq!(config.engine.transcoder_binary, "ffmpeg");
        assert_eq!(config.network.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json(
            r#"{ "engine": { "audio_bitrate_kbps": 192 }, "network": { "timeout_secs": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.engine.audio_bitrate_kbps, 192);
        assert_eq!(config.engine.merge_container, "mp4");
        assert_eq!(config.network.timeout(), Duration::from_secs(3));
        assert_eq!(config.network.short_link_patterns.len(), 1);
    }

    #[test]
    fn test_timeout_is_capped() {
        let config = AppConfig::from_json(r#"{ "network": { "timeout_secs": 60 } }"#).unwrap();
        assert_eq!(config.network.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = AppConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "UVD_YTDLP" => Some("/opt/bin/yt-dlp".to_string()),
            "UVD_FFMPEG" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.engine.ytdlp_binary, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(config.engine.transcoder_binary, "ffmpeg");
    }
}
