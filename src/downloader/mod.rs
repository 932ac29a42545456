pub mod http_pool;
pub mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::Result;

pub use ytdlp::YtDlpDownloader;

/// A single audio download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    /// Destination without extension; the downloader appends the format's.
    pub output_path: PathBuf,
    pub format: String,
    /// Target bitrate in kbps.
    pub bitrate: u32,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_path: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_path: output_path.into(),
            format: format.into(),
            bitrate: 192,
        }
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Where the finished file lands.
    pub fn final_path(&self) -> PathBuf {
        let mut name = self.output_path.clone().into_os_string();
        name.push(".");
        name.push(&self.format);
        PathBuf::from(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        filename: String,
        percent: Option<f32>,
        eta: Option<String>,
    },
    Finished {
        filename: String,
    },
    Error {
        message: String,
    },
}

pub type ProgressHook = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf>;
    fn supports_format(&self, format: &str) -> bool;
    fn get_name(&self) -> &str;
}

/// Downloads `url` as `<output_no_ext>.<format>` with a default yt-dlp runner.
pub async fn run_download(url: &str, output_no_ext: &Path, format: &str) -> Result<PathBuf> {
    let request = DownloadRequest::new(url, output_no_ext, format);
    YtDlpDownloader::default().download(&request).await
}
