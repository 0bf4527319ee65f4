use crate::api::Reachability;
use crate::application::{DownloadCoordinator, ProgressSink};
use crate::config::AppConfig;
use crate::domain::ProgressEvent;
use crate::ui::{DownloadMessage, DownloadView};
use futures::StreamExt;
use iced::Task;
use std::path::PathBuf;
use tracing::info;

pub struct DownloadApp {
    view: DownloadView,
    coordinator: DownloadCoordinator,
    // Only ever mutated here in `update`, i.e. on the UI thread
    progress: ProgressSink,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(AppConfig::load())
    }
}

impl DownloadApp {
    /// Startup state plus a clipboard read that pre-fills the URL field.
    pub fn boot() -> (Self, Task<Message>) {
        (
            Self::default(),
            iced::clipboard::read().map(Message::ClipboardRead),
        )
    }

    pub fn new(config: AppConfig) -> Self {
        let coordinator = DownloadCoordinator::new(&config);
        let view = DownloadView::new(config.default_destination);

        Self {
            view,
            coordinator,
            progress: ProgressSink::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    FolderChosen(Option<PathBuf>),
    ClipboardRead(Option<String>),
    /// Result for the URL that was actually probed
    ReachabilityChecked {
        url: String,
        result: Reachability,
    },
    /// Marshaled from the background download task
    DownloadProgress(ProgressEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::ChooseFolderPressed => {
                    return Task::perform(
                        async {
                            rfd::AsyncFileDialog::new()
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderChosen,
                    );
                }
                DownloadMessage::TestUrlPressed => {
                    match app.coordinator.test_reachability(&app.view.url) {
                        Ok(check) => {
                            app.view.reachability_status = "Checking...".to_string();
                            let url = app.view.url.clone();
                            return Task::perform(check, move |result| {
                                Message::ReachabilityChecked { url, result }
                            });
                        }
                        Err(e) => {
                            app.view.reachability_status = e.to_string();
                        }
                    }
                }
                DownloadMessage::DownloadPressed if !app.progress.is_active() => {
                    app.view.warning = None;

                    match app.coordinator.prepare(app.view.request()) {
                        Ok(prepared) => {
                            app.view.warning = prepared.warning.as_ref().map(ToString::to_string);
                            app.progress.start();
                            info!(url = %prepared.request.url, "Download requested");

                            // The stream runs on the background executor; each
                            // event comes back here as a message.
                            return Task::stream(
                                app.coordinator
                                    .download_stream(prepared)
                                    .map(Message::DownloadProgress),
                            );
                        }
                        Err(e) => {
                            app.view.warning = Some(e.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        Message::FolderChosen(path_opt) => {
            if let Some(path) = path_opt {
                app.view.destination = Some(path);
            }
        }
        Message::ClipboardRead(text) => {
            if let Some(url) = clipboard_url(text) {
                if app.view.url.is_empty() {
                    app.view.update(DownloadMessage::UrlChanged(url));
                }
            }
        }
        Message::ReachabilityChecked { url, result } => {
            // The field was edited while the check ran; the result is stale.
            if url == app.view.url {
                app.view.reachability_status = result.to_string();
            }
        }
        Message::DownloadProgress(event) => {
            app.progress.on_event(event);
        }
    }
    Task::none()
}

/// Clipboard text worth pre-filling: a single http(s) link.
fn clipboard_url(text: Option<String>) -> Option<String> {
    let text = text?;
    let text = text.trim();
    (text.starts_with("http") && !text.contains(char::is_whitespace)).then(|| text.to_string())
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view(&app.progress).map(Message::UiMessage)
}
