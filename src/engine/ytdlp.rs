use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{EngineError, EngineUpdate, MediaEngine, UpdateSender};
use crate::domain::{FetchPlan, PostProcessingStep};

const PROGRESS_MARKER: &str = "[uvd-progress] ";
const PROGRESS_TEMPLATE: &str =
    "download:[uvd-progress] %(progress.{status,downloaded_bytes,total_bytes,total_bytes_estimate})j";

/// Log tags yt-dlp prints once downloading is over and ffmpeg takes over.
const POSTPROCESSOR_TAGS: &[&str] = &[
    "Merger",
    "ExtractAudio",
    "VideoConvertor",
    "VideoRemuxer",
    "FixupM3u8",
    "FixupM4a",
    "FixupStretched",
    "FixupDuplicateMoov",
];

#[derive(Debug, Deserialize)]
struct RawProgress {
    status: Option<String>,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
}

/// Drives the `yt-dlp` executable as a subprocess.
pub struct YtDlpEngine {
    binary: PathBuf,
    user_agent: String,
}

impl YtDlpEngine {
    pub fn new(binary: PathBuf, user_agent: String) -> Self {
        Self { binary, user_agent }
    }

    pub fn build_args(&self, url: &str, plan: &FetchPlan) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--no-playlist".into(),
            "--encoding".into(),
            "utf-8".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--user-agent".into(),
            self.user_agent.clone(),
            "-f".into(),
            plan.stream_selector.clone(),
            "-o".into(),
            plan.output_template.to_string_lossy().into_owned(),
        ];

        for step in &plan.post_processing {
            match step {
                PostProcessingStep::ExtractAudio {
                    codec,
                    bitrate_kbps,
                } => {
                    args.push("--extract-audio".into());
                    args.push("--audio-format".into());
                    args.push(codec.clone());
                    args.push("--audio-quality".into());
                    args.push(format!("{}K", bitrate_kbps));
                }
                PostProcessingStep::MergeStreams { container } => {
                    args.push("--merge-output-format".into());
                    args.push(container.clone());
                }
            }
        }

        args.push("--".into());
        args.push(url.to_string());
        args
    }
}

/// Translates one stdout line into an engine update, if it carries one.
pub fn parse_line(line: &str) -> Option<EngineUpdate> {
    if let Some(json) = line.trim().strip_prefix(PROGRESS_MARKER) {
        let raw: RawProgress = serde_json::from_str(json).ok()?;
        let bytes_done = raw.downloaded_bytes.unwrap_or(0.0).max(0.0) as u64;
        let bytes_total = raw
            .total_bytes
            .or(raw.total_bytes_estimate)
            .filter(|total| *total > 0.0)
            .map(|total| total as u64);

        return match raw.status.as_deref() {
            Some("downloading") => Some(EngineUpdate::Downloading {
                bytes_done,
                bytes_total,
            }),
            Some("finished") => Some(EngineUpdate::PartFinished {
                bytes_done,
                bytes_total,
            }),
            _ => None,
        };
    }

    let tag = line.strip_prefix('[')?.split_once(']')?.0;
    POSTPROCESSOR_TAGS
        .contains(&tag)
        .then_some(EngineUpdate::Processing)
}

/// Reads one line as raw bytes. Titles may arrive in the locale encoding
/// rather than UTF-8, so invalid sequences are replaced instead of failing.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Picks the most useful line out of yt-dlp's stderr for a failure message.
fn summarize_stderr(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.iter().rev().find(|line| !line.trim().is_empty()))
        .map(|line| line.trim().to_string())
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        url: &str,
        plan: &FetchPlan,
        updates: UpdateSender,
    ) -> Result<(), EngineError> {
        let tool = self.binary.display().to_string();
        let args = self.build_args(url, plan);
        debug!(%tool, ?args, "Spawning engine");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(EngineError::MissingPipe)?;
        let stderr = child.stderr.take().ok_or(EngineError::MissingPipe)?;

        // Drained to EOF so a chatty engine never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut collected = Vec::new();
            loop {
                match next_line(&mut reader, &mut buf).await {
                    Ok(Some(line)) => {
                        debug!(target: "yt-dlp", "{}", line);
                        collected.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Stopped reading engine stderr");
                        break;
                    }
                }
            }
            collected
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = next_line(&mut reader, &mut buf).await? {
            match parse_line(&line) {
                Some(update) => {
                    let _ = updates.send(update);
                }
                None => debug!(target: "yt-dlp", "{}", line),
            }
        }

        let status = child.wait().await?;
        let stderr_lines = stderr_task.await.unwrap_or_default();

        if status.success() {
            info!(%url, "Engine finished");
            Ok(())
        } else {
            Err(EngineError::Exited {
                tool,
                status: status.to_string(),
                message: summarize_stderr(&stderr_lines)
                    .unwrap_or_else(|| "no error output".to_string()),
            })
        }
    }
}
