use crate::domain::{DownloadPhase, ProgressEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Idle,
    Indeterminate,
    Percent(f32),
}

/// Control-thread view of one download's progress.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    phase: DownloadPhase,
    percent: Option<f32>,
    // Highest percentage reported so far; keeps the bar from moving backwards
    // when the engine starts a second stream.
    high_water: f32,
    status: String,
}

impl ProgressSink {
    /// Resets state for a new request.
    pub fn start(&mut self) {
        *self = Self {
            phase: DownloadPhase::Downloading,
            status: "Starting download...".to_string(),
            ..Self::default()
        };
    }

    pub fn on_event(&mut self, event: ProgressEvent) {
        if matches!(self.phase, DownloadPhase::Completed | DownloadPhase::Failed) {
            return;
        }

        match event {
            ProgressEvent::Downloading {
                bytes_done,
                bytes_total,
            } => {
                self.phase = DownloadPhase::Downloading;
                match bytes_total.filter(|total| *total > 0) {
                    Some(total) => {
                        let ratio = (bytes_done as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
                        self.high_water = self.high_water.max(ratio as f32);
                        self.percent = Some(self.high_water);
                        self.status = format!("Downloading: {:.1}%", self.high_water);
                    }
                    None => {
                        self.percent = None;
                        self.status = "Downloading...".to_string();
                    }
                }
            }
            ProgressEvent::Processing => {
                self.phase = DownloadPhase::Processing;
                self.percent = None;
                self.status = "Processing...".to_string();
            }
            ProgressEvent::Completed => {
                self.phase = DownloadPhase::Completed;
                self.high_water = 100.0;
                self.percent = Some(100.0);
                self.status = "✅ Download complete.".to_string();
            }
            ProgressEvent::Failed { message } => {
                self.phase = DownloadPhase::Failed;
                self.percent = None;
                self.status = format!("Download failed: {}", message);
            }
        }
    }

    pub fn progress(&self) -> Progress {
        match self.phase {
            DownloadPhase::Idle | DownloadPhase::Failed => Progress::Idle,
            DownloadPhase::Downloading | DownloadPhase::Processing => {
                self.percent.map_or(Progress::Indeterminate, Progress::Percent)
            }
            DownloadPhase::Completed => Progress::Percent(100.0),
        }
    }

    /// Value for a 0..=100 progress bar; indeterminate keeps the last known level.
    pub fn bar_value(&self) -> f32 {
        match self.progress() {
            Progress::Idle => 0.0,
            Progress::Indeterminate => self.high_water,
            Progress::Percent(p) => p,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            DownloadPhase::Downloading | DownloadPhase::Processing
        )
    }
}
