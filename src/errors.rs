use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("ID3 error: {0}")]
    Id3(#[from] id3::Error),

    #[error("Tag error: {0}")]
    Lofty(#[from] lofty::error::LoftyError),

    #[error("API error: status {status}, body: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Failed to get links from {url} after {retries} tries")]
    RetriesExhausted { url: String, retries: u32 },

    #[error("Download error: {0}")]
    Download(String),

    #[error("Tagging error: {0}")]
    Tagging(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
