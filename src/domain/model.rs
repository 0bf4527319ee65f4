use std::fmt;
use std::path::PathBuf;

/// Container the user wants to end up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Video,
    Audio,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Video, OutputFormat::Audio];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "MP4 (video)"),
            Self::Audio => write!(f, "MP3 (audio)"),
        }
    }
}

/// Maximum vertical resolution offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    P1080,
    P1440,
    P2160,
    P4320,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::P1080,
        Resolution::P1440,
        Resolution::P2160,
        Resolution::P4320,
    ];

    pub fn height(self) -> u32 {
        match self {
            Self::P1080 => 1080,
            Self::P1440 => 1440,
            Self::P2160 => 2160,
            Self::P4320 => 4320,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

/// One user action worth of input, built once and passed through the pipeline by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_format: OutputFormat,
    pub target_resolution: Resolution,
    pub destination_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub transcoding_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessingStep {
    ExtractAudio { codec: String, bitrate_kbps: u32 },
    MergeStreams { container: String },
}

/// Fully resolved instructions for the fetch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub stream_selector: String,
    pub post_processing: Vec<PostProcessingStep>,
    pub output_template: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        bytes_done: u64,
        bytes_total: Option<u64>,
    },
    Processing,
    Completed,
    Failed {
        message: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed,
    Failed { message: String },
}

impl From<DownloadOutcome> for ProgressEvent {
    fn from(outcome: DownloadOutcome) -> Self {
        match outcome {
            DownloadOutcome::Completed => ProgressEvent::Completed,
            DownloadOutcome::Failed { message } => ProgressEvent::Failed { message },
        }
    }
}

/// Lifecycle of the single download the UI is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    Idle,
    Downloading,
    Processing,
    Completed,
    Failed,
}
