pub mod artwork;
pub mod tagger;

use std::path::{Path, PathBuf};

use crate::api::CatalogSongRecord;
use crate::errors::{AppError, Result};

pub use artwork::{Artwork, ArtworkFetcher};
pub use tagger::{Id3TagWriter, Mp4TagWriter};

/// Writes catalog metadata into one container format.
pub trait TagWriter {
    fn supports(&self, extension: &str) -> bool;
    fn write_tags(&self, path: &Path, record: &CatalogSongRecord, artwork: Option<&Artwork>) -> Result<()>;
    fn get_name(&self) -> &str;
}

fn writer_for(path: &Path) -> Result<&'static (dyn TagWriter + Sync)> {
    static WRITERS: [&(dyn TagWriter + Sync); 2] = [&Id3TagWriter, &Mp4TagWriter];

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    WRITERS
        .iter()
        .find(|w| w.supports(&extension))
        .copied()
        .ok_or(AppError::UnsupportedFormat(extension))
}

/// Tags `path` with the record's fields and optional cover. Failures are
/// logged and reported as `false`; a half-written file is left as is.
pub fn tag_file(path: &Path, record: &CatalogSongRecord, artwork: Option<&Artwork>) -> bool {
    let result = writer_for(path).and_then(|writer| {
        log::debug!("🏷️ [TAG] Tagging {:?} with {} writer", path, writer.get_name());
        writer.write_tags(path, record, artwork)
    });

    match result {
        Ok(()) => {
            log::info!(
                "✅ [TAG] Tagged {:?}: {} - {}{}",
                path,
                record.artist_name,
                record.track_name,
                if artwork.is_some() { " (with cover)" } else { "" }
            );
            true
        }
        Err(e) => {
            log::error!("❌ [TAG] Failed to tag {:?}: {}", path, e);
            false
        }
    }
}

/// Fetches the record's artwork and tags the file, with or without a cover.
pub async fn tag_downloaded_file(path: &Path, record: &CatalogSongRecord, fetcher: &ArtworkFetcher) -> bool {
    let artwork = fetcher.fetch_best(&record.artwork_url).await;

    let path: PathBuf = path.to_path_buf();
    let record = record.clone();
    match tokio::task::spawn_blocking(move || tag_file(&path, &record, artwork.as_ref())).await {
        Ok(tagged) => tagged,
        Err(e) => {
            log::error!("❌ [TAG] Tagging task failed: {}", e);
            false
        }
    }
}
