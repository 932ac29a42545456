use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::errors::{AppError, Result};
use crate::web::render::RenderOptions;

const ENV_PREFIX: &str = "SONGBIRD";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub download_path: PathBuf,
    pub library_path: Option<PathBuf>,
    pub preferred_quality: AudioQuality,
    pub preferred_format: AudioFormat,
    pub catalog: CatalogConfig,
    pub video_site: VideoSiteConfig,
    pub renderer: RendererConfig,
    pub downloader: DownloaderConfig,
    pub artwork: ArtworkConfig,
    pub proxy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    pub search_url: String,
    pub lookup_url: String,
    pub default_limit: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideoSiteConfig {
    pub home_url: String,
    pub search_url: String,
    /// Form field that receives the literal search term.
    pub query_field: String,
    /// CSS selector for result titles; matches must carry `title` and `href`.
    pub title_selector: String,
    pub retry_count: u32,
    pub render_timeout_secs: u64,
    pub render_wait_ms: u64,
    pub render_sleep_secs: u64,
    pub render_reload: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RendererConfig {
    pub enabled: bool,
    pub chromium_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloaderConfig {
    pub ytdlp_path: String,
    pub ffmpeg_location: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArtworkConfig {
    /// Size token present in the catalog's artwork url.
    pub base_size: String,
    /// Candidate sizes, smallest first. Probed from the end.
    pub sizes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,    // 128 kbps
    Medium, // 192 kbps
    High,   // 256 kbps
    Best,   // 320 kbps
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_path: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("./downloads")),
            library_path: None,
            preferred_quality: AudioQuality::Medium,
            preferred_format: AudioFormat::Mp3,
            catalog: CatalogConfig::default(),
            video_site: VideoSiteConfig::default(),
            renderer: RendererConfig::default(),
            downloader: DownloaderConfig::default(),
            artwork: ArtworkConfig::default(),
            proxy: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_url: "https://itunes.apple.com/search".to_string(),
            lookup_url: "https://itunes.apple.com/lookup".to_string(),
            default_limit: 20,
        }
    }
}

impl Default for VideoSiteConfig {
    fn default() -> Self {
        Self {
            home_url: "https://www.youtube.com".to_string(),
            search_url: "https://www.youtube.com/results".to_string(),
            query_field: "search_query".to_string(),
            title_selector: "#video-title".to_string(),
            retry_count: 3,
            render_timeout_secs: 20,
            render_wait_ms: 200,
            render_sleep_secs: 1,
            render_reload: true,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chromium_path: "chromium".to_string(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_location: None,
        }
    }
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            base_size: "100x100".to_string(),
            sizes: [
                "100x100", "500x500", "1000x1000", "1500x1500",
                "2000x2000", "2500x2500", "3000x3000",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the JSON config file (if present), then
    /// `SONGBIRD__SECTION__KEY` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(
                config::File::from(config_path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                std::fs::create_dir_all(config_dir)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::Config(config::ConfigError::Message("Could not find config directory".to_string())))?;

        Ok(config_dir.join("songbird").join("config.json"))
    }

    pub fn get_quality_bitrate(&self) -> u32 {
        match self.preferred_quality {
            AudioQuality::Low => 128,
            AudioQuality::Medium => 192,
            AudioQuality::High => 256,
            AudioQuality::Best => 320,
        }
    }

    pub fn get_format_extension(&self) -> &'static str {
        self.preferred_format.extension()
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            timeout: Duration::from_secs(self.video_site.render_timeout_secs),
            wait: Duration::from_millis(self.video_site.render_wait_ms),
            sleep: Duration::from_secs(self.video_site.render_sleep_secs),
            reload: self.video_site.render_reload,
        }
    }
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
        }
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            other => Err(AppError::UnsupportedFormat(other.to_string())),
        }
    }
}
