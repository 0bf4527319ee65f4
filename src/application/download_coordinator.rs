use std::future::Future;
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::capability::{CapabilityProbe, SystemProbe};
use super::executor::DownloadExecutor;
use super::plan_builder::PlanBuilder;
use crate::{
    api::{HttpClient, Reachability},
    config::AppConfig,
    domain::{
        AppError, Capabilities, CapabilityWarning, DownloadOutcome, DownloadRequest, OutputFormat,
        ProgressEvent,
    },
    engine::{MediaEngine, YtDlpEngine},
    utils::{ensure_directory, validate_url},
};

/// A request that passed validation, with the capability snapshot it was
/// checked against.
#[derive(Debug, Clone)]
pub struct PreparedDownload {
    pub request: DownloadRequest,
    pub capabilities: Capabilities,
    pub warning: Option<CapabilityWarning>,
}

/// Background unit of work for one download.
pub struct DownloadHandle {
    task: JoinHandle<DownloadOutcome>,
}

impl DownloadHandle {
    pub async fn outcome(self) -> DownloadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome::Failed {
                message: format!("download task ended unexpectedly: {}", e),
            },
        }
    }
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    http: HttpClient,
    probe: Arc<dyn CapabilityProbe>,
    planner: PlanBuilder,
    executor: Arc<DownloadExecutor>,
}

impl DownloadCoordinator {
    pub fn new(config: &AppConfig) -> Self {
        let engine = YtDlpEngine::new(
            config.engine.ytdlp_binary.clone(),
            config.network.user_agent.clone(),
        );

        Self::with_parts(
            HttpClient::new(config.network.clone()),
            Arc::new(SystemProbe::new(config.engine.transcoder_binary.clone())),
            PlanBuilder::new(&config.engine),
            Arc::new(engine),
        )
    }

    pub fn with_parts(
        http: HttpClient,
        probe: Arc<dyn CapabilityProbe>,
        planner: PlanBuilder,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            http,
            probe,
            planner,
            executor: Arc::new(DownloadExecutor::new(engine)),
        }
    }

    /// Synchronous input checks; no network access.
    pub fn validate(request: DownloadRequest) -> Result<DownloadRequest, AppError> {
        let url = validate_url(&request.url)?;
        let destination_directory = ensure_directory(&request.destination_directory)?;

        Ok(DownloadRequest {
            url,
            destination_directory,
            ..request
        })
    }

    /// Validates the request and checks it against the host's capabilities.
    /// Audio without a transcoder is rejected; video without one proceeds
    /// with a warning.
    pub fn prepare(&self, request: DownloadRequest) -> Result<PreparedDownload, AppError> {
        let request = Self::validate(request)?;
        let capabilities = self.probe.capabilities();

        let warning = match (request.output_format, capabilities.transcoding_available) {
            (OutputFormat::Audio, false) => {
                warn!("Rejecting audio request: no transcoder available");
                return Err(AppError::TranscoderRequired);
            }
            (OutputFormat::Video, false) => {
                warn!("Transcoder missing, falling back to a pre-combined stream");
                Some(CapabilityWarning(
                    "FFmpeg not found. Falling back to lower-quality stream with audio."
                        .to_string(),
                ))
            }
            _ => None,
        };

        Ok(PreparedDownload {
            request,
            capabilities,
            warning,
        })
    }

    /// Validates `url` now and returns the probe to run in the background.
    pub fn test_reachability(
        &self,
        url: &str,
    ) -> Result<impl Future<Output = Reachability> + Send + 'static, AppError> {
        let url = validate_url(url)?;
        let http = self.http.clone();
        Ok(async move { http.check_reachability(&url).await })
    }

    async fn run<F>(&self, prepared: PreparedDownload, on_progress: F) -> DownloadOutcome
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let PreparedDownload {
            request,
            capabilities,
            ..
        } = prepared;

        let url = self.http.resolve(&request.url).await;
        let plan = self.planner.build(
            request.output_format,
            request.target_resolution,
            capabilities.transcoding_available,
            &request.destination_directory,
        );
        info!(
            %url,
            format = ?request.output_format,
            resolution = request.target_resolution.height(),
            transcoding = capabilities.transcoding_available,
            "Planned download"
        );

        self.executor
            .execute_locked(&request.destination_directory, url, plan, on_progress)
            .await
    }

    /// Resolves, plans and executes on a background task. `on_progress` sees
    /// every progress event and exactly one terminal event.
    pub fn plan_and_download<F>(&self, prepared: PreparedDownload, on_progress: F) -> DownloadHandle
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        let coordinator = self.clone();
        DownloadHandle {
            task: tokio::spawn(async move { coordinator.run(prepared, on_progress).await }),
        }
    }

    /// Event stream for the control thread. Ends right after the terminal event.
    pub fn download_stream(&self, prepared: PreparedDownload) -> BoxStream<'static, ProgressEvent> {
        futures::stream::unfold(
            DownloadStreamState::Start {
                coordinator: self.clone(),
                prepared,
            },
            |state| async move {
                match state {
                    DownloadStreamState::Start {
                        coordinator,
                        prepared,
                    } => {
                        let (tx, rx) = mpsc::unbounded_channel();
                        let handle = coordinator.plan_and_download(prepared, move |event| {
                            let _ = tx.send(event);
                        });
                        next_event(rx, handle).await
                    }
                    DownloadStreamState::Running { rx, handle } => next_event(rx, handle).await,
                    DownloadStreamState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

enum DownloadStreamState {
    Start {
        coordinator: DownloadCoordinator,
        prepared: PreparedDownload,
    },
    Running {
        rx: mpsc::UnboundedReceiver<ProgressEvent>,
        handle: DownloadHandle,
    },
    Finished,
}

async fn next_event(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    handle: DownloadHandle,
) -> Option<(ProgressEvent, DownloadStreamState)> {
    match rx.recv().await {
        Some(event) if event.is_terminal() => Some((event, DownloadStreamState::Finished)),
        Some(event) => Some((event, DownloadStreamState::Running { rx, handle })),
        // Sender dropped without a terminal event: the task died, report how.
        None => Some((handle.outcome().await.into(), DownloadStreamState::Finished)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NetworkConfig;
    use crate::application::executor::tests::ScriptedEngine;
    use crate::domain::Resolution;
    use crate::engine::EngineUpdate;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedProbe(bool);

    impl CapabilityProbe for FixedProbe {
        fn has_transcoder(&self) -> bool {
            self.0
        }
    }

    fn request(url: &str, format: OutputFormat, dir: PathBuf) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            output_format: format,
            target_resolution: Resolution::P1080,
            destination_directory: dir,
        }
    }

    fn coordinator(
        network: NetworkConfig,
        transcoder: bool,
        engine: Arc<ScriptedEngine>,
    ) -> DownloadCoordinator {
        DownloadCoordinator::with_parts(
            HttpClient::new(network),
            Arc::new(FixedProbe(transcoder)),
            PlanBuilder::default(),
            engine,
        )
    }

    fn completing_engine() -> Arc<ScriptedEngine> {
        Arc::new(ScriptedEngine::new(
            vec![
                EngineUpdate::Downloading {
                    bytes_done: 500,
                    bytes_total: Some(1000),
                },
                EngineUpdate::Downloading {
                    bytes_done: 1000,
                    bytes_total: Some(1000),
                },
            ],
            Ok(()),
        ))
    }

    #[test]
    fn test_empty_or_malformed_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(NetworkConfig::default(), true, completing_engine());

        for url in ["", "   ", "youtube.com/watch", "ftp://example.com/v"] {
            let err = coordinator
                .prepare(request(url, OutputFormat::Video, dir.path().to_path_buf()))
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{url}: {err}");
        }
    }

    #[test]
    fn test_missing_destination_is_rejected() {
        let coordinator = coordinator(NetworkConfig::default(), true, completing_engine());
        let err = coordinator
            .prepare(request(
                "https://example.com/v",
                OutputFormat::Video,
                PathBuf::new(),
            ))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_destination_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("media").join("clips");
        let coordinator = coordinator(NetworkConfig::default(), true, completing_engine());

        let prepared = coordinator
            .prepare(request(
                "https://example.com/v",
                OutputFormat::Video,
                nested.clone(),
            ))
            .unwrap();

        assert!(nested.is_dir());
        assert!(prepared.warning.is_none());
    }

    #[tokio::test]
    async fn test_audio_without_transcoder_rejected_before_network() {
        let mut server = mockito::Server::new_async().await;
        let never = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let network = NetworkConfig {
            short_link_patterns: vec![format!("^{}/", regex::escape(&server.url()))],
            ..Default::default()
        };
        let coordinator = coordinator(network, false, completing_engine());

        let err = coordinator
            .prepare(request(
                &format!("{}/s/abc", server.url()),
                OutputFormat::Audio,
                dir.path().to_path_buf(),
            ))
            .unwrap_err();

        assert_eq!(err, AppError::TranscoderRequired);
        never.assert_async().await;
    }

    #[test]
    fn test_video_without_transcoder_warns() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(NetworkConfig::default(), false, completing_engine());

        let prepared = coordinator
            .prepare(request(
                "https://example.com/v",
                OutputFormat::Video,
                dir.path().to_path_buf(),
            ))
            .unwrap();

        assert!(!prepared.capabilities.transcoding_available);
        assert!(prepared.warning.unwrap().0.contains("FFmpeg not found"));
    }

    #[test]
    fn test_reachability_input_is_checked_synchronously() {
        let coordinator = coordinator(NetworkConfig::default(), true, completing_engine());
        assert!(matches!(
            coordinator.test_reachability("not a url"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_short_link_is_resolved_before_engine() {
        let mut server = mockito::Server::new_async().await;
        let canonical = format!("{}/video/7312", server.url());
        let _redirect = server
            .mock("GET", "/s/abc")
            .with_status(302)
            .with_header("location", &canonical)
            .create_async()
            .await;
        let _page = server
            .mock("GET", "/video/7312")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let engine = completing_engine();
        let network = NetworkConfig {
            short_link_patterns: vec![format!("^{}/s/", regex::escape(&server.url()))],
            ..Default::default()
        };
        let coordinator = coordinator(network, true, engine.clone());

        let prepared = coordinator
            .prepare(request(
                &format!("{}/s/abc", server.url()),
                OutputFormat::Video,
                dir.path().to_path_buf(),
            ))
            .unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let outcome = coordinator
            .plan_and_download(prepared, move |e| sink.lock().unwrap().push(e))
            .outcome()
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed);
        assert_eq!(*engine.urls.lock().unwrap(), vec![canonical]);
        assert_eq!(events.lock().unwrap().last(), Some(&ProgressEvent::Completed));
    }

    #[tokio::test]
    async fn test_download_stream_ends_after_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(NetworkConfig::default(), true, completing_engine());
        let prepared = coordinator
            .prepare(request(
                "https://example.com/v",
                OutputFormat::Video,
                dir.path().to_path_buf(),
            ))
            .unwrap();

        let events: Vec<ProgressEvent> = coordinator.download_stream(prepared).collect().await;

        assert_eq!(
            events,
            vec![
                ProgressEvent::Downloading {
                    bytes_done: 500,
                    bytes_total: Some(1000)
                },
                ProgressEvent::Downloading {
                    bytes_done: 1000,
                    bytes_total: Some(1000)
                },
                ProgressEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_download_stream_reports_engine_failure_once() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(
            vec![EngineUpdate::Downloading {
                bytes_done: 10,
                bytes_total: Some(100),
            }],
            Err("ERROR: Private video".to_string()),
        ));
        let coordinator = coordinator(NetworkConfig::default(), true, engine);
        let prepared = coordinator
            .prepare(request(
                "https://example.com/v",
                OutputFormat::Audio,
                dir.path().to_path_buf(),
            ))
            .unwrap();

        let events: Vec<ProgressEvent> = coordinator.download_stream(prepared).collect().await;

        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        match events.last() {
            Some(ProgressEvent::Failed { message }) => assert!(message.contains("Private video")),
            other => panic!("unexpected last event: {:?}", other),
        }
    }
}
