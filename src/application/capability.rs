use tracing::debug;

use crate::domain::Capabilities;

/// Host environment query for the optional transcoding tool.
pub trait CapabilityProbe: Send + Sync {
    fn has_transcoder(&self) -> bool;

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            transcoding_available: self.has_transcoder(),
        }
    }
}

/// Looks the transcoder up on `PATH` (or at an explicit path).
pub struct SystemProbe {
    transcoder: String,
}

impl SystemProbe {
    pub fn new(transcoder: impl Into<String>) -> Self {
        Self {
            transcoder: transcoder.into(),
        }
    }
}

impl CapabilityProbe for SystemProbe {
    fn has_transcoder(&self) -> bool {
        let found = which::which(&self.transcoder);
        debug!(transcoder = %self.transcoder, found = ?found.as_ref().ok(), "Transcoder lookup");
        found.is_ok()
    }
}
