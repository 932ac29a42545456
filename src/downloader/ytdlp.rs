use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::DownloaderConfig;
use crate::downloader::{DownloadRequest, Downloader, ProgressEvent, ProgressHook};
use crate::errors::{AppError, Result};

const PROGRESS_MARKER: &str = "songbird-progress";

const SUPPORTED_FORMATS: &[&str] = &["mp3", "m4a", "aac", "flac", "opus", "vorbis", "wav", "alac"];

fn progress_regex() -> Option<&'static Regex> {
    static PROGRESS_RE: OnceLock<Option<Regex>> = OnceLock::new();
    PROGRESS_RE
        .get_or_init(|| {
            Regex::new(r"^songbird-progress (?P<status>\w+)\|(?P<percent>[^|]*)\|(?P<eta>[^|]*)\|(?P<filename>.*)$").ok()
        })
        .as_ref()
}

/// Turns one line of our progress template into an event.
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let caps = progress_regex()?.captures(line.trim_end())?;
    let filename = caps["filename"].trim().to_string();

    match &caps["status"] {
        "downloading" => {
            let percent = caps["percent"].trim().trim_end_matches('%').parse::<f32>().ok();
            let eta = match caps["eta"].trim() {
                "" | "NA" | "N/A" | "Unknown" => None,
                eta => Some(eta.to_string()),
            };
            Some(ProgressEvent::Downloading { filename, percent, eta })
        }
        "finished" => Some(ProgressEvent::Finished { filename }),
        "error" => Some(ProgressEvent::Error {
            message: format!("yt-dlp reported an error for {}", filename),
        }),
        _ => None,
    }
}

/// Routes yt-dlp output into the log by its own severity prefix.
fn log_ytdlp_line(line: &str) {
    let line = line.trim_end();
    if line.is_empty() {
        return;
    }
    if let Some(msg) = line.strip_prefix("ERROR:") {
        log::error!("❌ [YT-DLP] {}", msg.trim());
    } else if let Some(msg) = line.strip_prefix("WARNING:") {
        log::warn!("⚠️ [YT-DLP] {}", msg.trim());
    } else {
        log::debug!("[YT-DLP] {}", line);
    }
}

/// A hook that draws a terminal progress bar.
pub fn progress_bar_hook() -> ProgressHook {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% eta {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    Box::new(move |event: &ProgressEvent| match event {
        ProgressEvent::Downloading { percent, eta, .. } => {
            if let Some(percent) = percent {
                bar.set_position(percent.clamp(0.0, 100.0) as u64);
            }
            bar.set_message(eta.clone().unwrap_or_default());
        }
        ProgressEvent::Finished { .. } => {
            bar.finish_and_clear();
            log::info!("🔄 [YT-DLP] Done downloading, now converting ...");
        }
        ProgressEvent::Error { .. } => bar.abandon(),
    })
}

/// Downloads audio by running the yt-dlp executable.
pub struct YtDlpDownloader {
    ytdlp_path: String,
    ffmpeg_location: Option<PathBuf>,
    hook: Option<ProgressHook>,
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp").with_hook(progress_bar_hook())
    }
}

impl YtDlpDownloader {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            ffmpeg_location: None,
            hook: None,
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.ytdlp_path.clone())
            .with_ffmpeg_location(config.ffmpeg_location.clone())
            .with_hook(progress_bar_hook())
    }

    pub fn with_ffmpeg_location(mut self, location: Option<PathBuf>) -> Self {
        self.ffmpeg_location = location;
        self
    }

    pub fn with_hook(mut self, hook: ProgressHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub(crate) fn build_args(&self, request: &DownloadRequest) -> Vec<String> {
        let output_template = format!("{}.%(ext)s", request.output_path.to_string_lossy());
        let progress_template = format!(
            "download:{} %(progress.status)s|%(progress._percent_str)s|%(progress._eta_str)s|%(progress.filename)s",
            PROGRESS_MARKER
        );

        let mut args = vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            request.format.clone(),
            "--audio-quality".to_string(),
            format!("{}K", request.bitrate),
            "--no-cache-dir".to_string(),
            "--no-check-certificate".to_string(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            progress_template,
            "--output".to_string(),
            output_template,
        ];

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }

        args.push(request.url.clone());
        args
    }

    fn emit(&self, event: &ProgressEvent) {
        if let Some(hook) = &self.hook {
            hook(event);
        }
    }

    fn fail(&self, request: &DownloadRequest, message: String) -> AppError {
        log::error!("❌ [YT-DLP] Failed to download {}: {}", request.url, message);
        self.emit(&ProgressEvent::Error { message: message.clone() });
        AppError::Download(message)
    }
}

/// Reads `reader` to the end, handing each line to `on_line`.
/// Bytes that are not utf-8 are replaced so the pipe is never left undrained.
async fn drain_lines<R, F>(mut reader: R, mut on_line: F)
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                log::warn!("⚠️ [YT-DLP] Stopped reading output: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf> {
        if !self.supports_format(&request.format) {
            return Err(AppError::UnsupportedFormat(request.format.clone()));
        }

        let args = self.build_args(request);
        log::info!("⬇️ [YT-DLP] Downloading {} to {:?}", request.url, request.output_path);
        log::debug!("🚀 [YT-DLP] Running {} {:?}", self.ytdlp_path, args);

        let mut child = match Command::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return Err(self.fail(request, format!("Failed to start {}: {}", self.ytdlp_path, e))),
        };

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                drain_lines(BufReader::new(stderr), log_ytdlp_line).await;
            })
        });

        if let Some(stdout) = child.stdout.take() {
            drain_lines(BufReader::new(stdout), |line| match parse_progress_line(line) {
                Some(event) => self.emit(&event),
                None => log_ytdlp_line(line),
            })
            .await;
        }

        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => return Err(self.fail(request, format!("yt-dlp did not finish: {}", e))),
        };

        if !status.success() {
            return Err(self.fail(request, format!("yt-dlp exited with {}", status)));
        }

        let final_path = request.final_path();
        if !final_path.exists() {
            log::warn!("⚠️ [YT-DLP] Expected output {:?} was not found", final_path);
        }
        log::info!("✅ [YT-DLP] Downloaded {:?}", final_path);
        Ok(final_path)
    }

    fn supports_format(&self, format: &str) -> bool {
        SUPPORTED_FORMATS.contains(&format)
    }

    fn get_name(&self) -> &str {
        "yt-dlp"
    }
}
