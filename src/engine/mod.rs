pub mod ytdlp;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::FetchPlan;

pub use ytdlp::YtDlpEngine;

/// Non-terminal notification raised by an engine while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    Downloading {
        bytes_done: u64,
        bytes_total: Option<u64>,
    },
    /// The current part (one stream file) is fully downloaded; any further
    /// byte counts belong to the next part.
    PartFinished {
        bytes_done: u64,
        bytes_total: Option<u64>,
    },
    Processing,
}

pub type UpdateSender = mpsc::UnboundedSender<EngineUpdate>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while reading engine output: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine output stream unavailable")]
    MissingPipe,

    #[error("{tool} failed ({status}): {message}")]
    Exited {
        tool: String,
        status: String,
        message: String,
    },
}

/// The external fetch/transcode engine. Implementations perform all network
/// I/O and demuxing for one URL according to a resolved plan.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Download `url` following `plan`, reporting progress on `updates`.
    async fn fetch(
        &self,
        url: &str,
        plan: &FetchPlan,
        updates: UpdateSender,
    ) -> Result<(), EngineError>;
}
