use std::path::PathBuf;

use iced::{
    widget::{button, column, pick_list, progress_bar, row, text, text_input, Space},
    Element, Length,
};

use crate::application::ProgressSink;
use crate::domain::{DownloadRequest, OutputFormat, Resolution};

/// Main view state
pub struct DownloadView {
    pub url: String,
    pub format: OutputFormat,
    pub resolution: Resolution,
    pub destination: Option<PathBuf>,
    pub reachability_status: String,
    pub warning: Option<String>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self::new(None)
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    FormatSelected(OutputFormat),
    ResolutionSelected(Resolution),
    ChooseFolderPressed,
    TestUrlPressed,
    DownloadPressed,
}

impl DownloadView {
    pub fn new(destination: Option<PathBuf>) -> Self {
        Self {
            url: String::new(),
            format: OutputFormat::default(),
            resolution: Resolution::default(),
            destination,
            reachability_status: String::new(),
            warning: None,
        }
    }

    /// Snapshot of the form as an immutable request.
    pub fn request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url.clone(),
            output_format: self.format,
            target_resolution: self.resolution,
            destination_directory: self.destination.clone().unwrap_or_default(),
        }
    }

    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.url = url;
                self.reachability_status.clear();
            }
            DownloadMessage::FormatSelected(format) => self.format = format,
            DownloadMessage::ResolutionSelected(resolution) => self.resolution = resolution,
            DownloadMessage::ChooseFolderPressed
            | DownloadMessage::TestUrlPressed
            | DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view<'a>(&'a self, progress: &'a ProgressSink) -> Element<'a, DownloadMessage> {
        let busy = progress.is_active();
        let folder = self
            .destination
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "No folder selected".to_string());

        let mut content = column![
            text("Universal Video Downloader").size(28),
            Space::new().height(Length::Fixed(10.0)),
            text("Enter Video URL:").size(16),
            text_input("https://...", &self.url)
                .on_input(DownloadMessage::UrlChanged)
                .padding(10),
            row![
                button("Test URL").on_press(DownloadMessage::TestUrlPressed),
                text(&self.reachability_status).size(14),
            ]
            .spacing(10),
            text("Choose Format:").size(16),
            pick_list(
                OutputFormat::ALL,
                Some(self.format),
                DownloadMessage::FormatSelected
            ),
            text("Choose Resolution:").size(16),
            pick_list(
                Resolution::ALL,
                Some(self.resolution),
                DownloadMessage::ResolutionSelected
            ),
            row![
                button("Choose Download Folder").on_press(DownloadMessage::ChooseFolderPressed),
                text(folder).size(14),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            button("Start Download")
                .on_press_maybe((!busy).then_some(DownloadMessage::DownloadPressed))
                .padding([10, 20]),
            progress_bar(0.0..=100.0, progress.bar_value()),
            text(progress.status()).size(14),
        ]
        .padding(20)
        .spacing(10);

        if let Some(warning) = &self.warning {
            content = content.push(text(warning).size(14));
        }

        content.into()
    }
}
