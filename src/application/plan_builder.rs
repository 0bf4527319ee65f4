use std::path::Path;

use crate::config::EngineConfig;
use crate::domain::{FetchPlan, OutputFormat, PostProcessingStep, Resolution};

/// Title plus native extension, so different media never share a filename.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

const AUDIO_CODEC: &str = "mp3";

/// Turns the user's choices into a yt-dlp stream selector and post-processing
/// chain. Pure: the same inputs always give the same plan.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    audio_bitrate_kbps: u32,
    merge_container: String,
    prefer_m4a_audio: bool,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl PlanBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            audio_bitrate_kbps: config.audio_bitrate_kbps,
            merge_container: config.merge_container.clone(),
            prefer_m4a_audio: config.prefer_m4a_audio,
        }
    }

    fn audio_selector(&self) -> String {
        if self.prefer_m4a_audio {
            "bestaudio[ext=m4a]/bestaudio".to_string()
        } else {
            "bestaudio".to_string()
        }
    }

    pub fn build(
        &self,
        format: OutputFormat,
        resolution: Resolution,
        transcoding_available: bool,
        destination: &Path,
    ) -> FetchPlan {
        let height = resolution.height();

        let (stream_selector, post_processing) = match (format, transcoding_available) {
            (OutputFormat::Audio, true) => (
                self.audio_selector(),
                vec![PostProcessingStep::ExtractAudio {
                    codec: AUDIO_CODEC.to_string(),
                    bitrate_kbps: self.audio_bitrate_kbps,
                }],
            ),
            // Rejected before planning; kept total so the table has no holes.
            (OutputFormat::Audio, false) => (self.audio_selector(), Vec::new()),
            (OutputFormat::Video, true) => (
                format!(
                    "bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
                    h = height
                ),
                vec![PostProcessingStep::MergeStreams {
                    container: self.merge_container.clone(),
                }],
            ),
            // Without a muxer only pre-combined streams are usable.
            (OutputFormat::Video, false) => (format!("best[height<={}]", height), Vec::new()),
        };

        FetchPlan {
            stream_selector,
            post_processing,
            output_template: destination.join(OUTPUT_TEMPLATE),
        }
    }
}
