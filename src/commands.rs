use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{CatalogAlbumRecord, CatalogClient, CatalogSongRecord};
use crate::config::AppConfig;
use crate::display::{print_indexed, print_records};
use crate::downloader::http_pool::HttpPool;
use crate::downloader::{DownloadRequest, Downloader, YtDlpDownloader};
use crate::errors::{AppError, Result};
use crate::library::search_library;
use crate::metadata::{tag_downloaded_file, ArtworkFetcher};
use crate::search::{get_video_links, HarvestRequest, VideoLink, VideoLinks};
use crate::security::InputValidator;
use crate::utils::{ensure_dir_exists, fname_duper, remove_illegal_characters};
use crate::web::render::{ChromiumRenderer, PageRenderer, StaticRenderer};

const HTTP_TIMEOUT_SECS: u64 = 30;
const DUPLICATE_LIMIT: u32 = 10;
const DUPLICATE_KEY: &str = "_dup";

/// Record fields hidden when listing search results.
pub const RECORD_IGNORE_KEYS: &[&str] = &["artworkUrl100", "collectionId", "collectionArtistName"];

/// Outcome of [`Songbird::acquire`].
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    Downloaded { path: PathBuf, tagged: bool },
    /// The song already exists in the local library; nothing was downloaded.
    InLibrary(Vec<PathBuf>),
}

/// Search, harvest, download and tag, wired from one [`AppConfig`].
pub struct Songbird {
    config: AppConfig,
    pool: HttpPool,
    catalog: CatalogClient,
    artwork: ArtworkFetcher,
    renderer: Arc<dyn PageRenderer>,
    downloader: Box<dyn Downloader>,
    validator: InputValidator,
}

impl Songbird {
    pub fn new(config: AppConfig) -> Result<Self> {
        let pool = HttpPool::new(HTTP_TIMEOUT_SECS).with_proxy(config.proxy.as_deref());
        let client = pool.client()?;

        let renderer: Arc<dyn PageRenderer> = if config.renderer.enabled {
            Arc::new(ChromiumRenderer::new(config.renderer.chromium_path.clone()))
        } else {
            Arc::new(StaticRenderer)
        };

        log::info!("🐦 [SONGBIRD] Ready (renderer: {}, downloads: {:?})", renderer.get_name(), config.download_path);
        Ok(Self {
            catalog: CatalogClient::new(client.clone(), &config.catalog),
            artwork: ArtworkFetcher::new(client, &config.artwork),
            downloader: Box::new(YtDlpDownloader::from_config(&config.downloader)),
            renderer,
            pool,
            config,
            validator: InputValidator::new(),
        })
    }

    pub fn with_downloader(mut self, downloader: Box<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn artwork(&self) -> &ArtworkFetcher {
        &self.artwork
    }

    pub async fn find_songs(&self, term: &str, limit: Option<u32>) -> Result<Vec<CatalogSongRecord>> {
        self.validator.validate_search_query(term)?;
        self.catalog
            .search_songs(term, limit.unwrap_or(self.config.catalog.default_limit))
            .await
    }

    pub async fn find_albums(&self, term: &str, limit: Option<u32>) -> Result<Vec<CatalogAlbumRecord>> {
        self.validator.validate_search_query(term)?;
        self.catalog
            .search_albums(term, limit.unwrap_or(self.config.catalog.default_limit))
            .await
    }

    pub async fn album_tracks(&self, album: &CatalogAlbumRecord) -> Result<Vec<CatalogSongRecord>> {
        self.catalog.lookup_album_tracks(album).await
    }

    pub fn harvest_request(&self, query: &str) -> HarvestRequest {
        let site = &self.config.video_site;
        HarvestRequest {
            title_selector: site.title_selector.clone(),
            render: self.config.render_options(),
            retry_count: site.retry_count,
            ..HarvestRequest::new(
                site.home_url.clone(),
                site.search_url.clone(),
                vec![(site.query_field.clone(), query.to_string())],
            )
        }
    }

    /// Free-text video search.
    pub async fn video_links(&self, query: &str) -> Result<VideoLinks> {
        self.validator.validate_search_query(query)?;
        get_video_links(&self.harvest_request(query), &self.pool, self.renderer.clone()).await
    }

    /// Video search for `"<track> <artist>"`.
    pub async fn video_links_for(&self, record: &CatalogSongRecord) -> Result<VideoLinks> {
        self.video_links(&format!("{} {}", record.track_name, record.artist_name)).await
    }

    /// `download_path/<artist - title>` without extension, moved aside from
    /// any existing file of the configured format.
    pub fn output_path_for(&self, record: &CatalogSongRecord) -> Result<PathBuf> {
        let name = remove_illegal_characters(&format!("{} - {}", record.artist_name, record.track_name));
        let with_ext = self
            .config
            .download_path
            .join(format!("{}.{}", name, self.config.get_format_extension()));

        let free = fname_duper(&with_ext, DUPLICATE_LIMIT, 0, DUPLICATE_KEY)
            .ok_or_else(|| AppError::Validation(format!("No free file name for {:?}", with_ext)))?;
        Ok(free.with_extension(""))
    }

    /// Library files that look like `record`. Empty without a library path.
    pub fn library_matches(&self, record: &CatalogSongRecord) -> Vec<PathBuf> {
        match &self.config.library_path {
            Some(root) => search_library(root, &record.track_name, Some(&record.artist_name)),
            None => Vec::new(),
        }
    }

    pub async fn acquire(&self, record: &CatalogSongRecord, link: &VideoLink) -> Result<Acquisition> {
        self.validator.validate_url(&link.url)?;

        let existing = self.library_matches(record);
        if !existing.is_empty() {
            log::warn!(
                "⚠️ [SONGBIRD] {} - {} is already in the library: {:?}",
                record.artist_name, record.track_name, existing
            );
            return Ok(Acquisition::InLibrary(existing));
        }

        ensure_dir_exists(&self.config.download_path)?;
        let output = self.output_path_for(record)?;
        let request = DownloadRequest::new(link.url.clone(), output, self.config.get_format_extension())
            .with_bitrate(self.config.get_quality_bitrate());

        log::info!("⬇️ [SONGBIRD] {} - {} from {}", record.artist_name, record.track_name, link.url);
        let path = self.downloader.download(&request).await?;
        let tagged = tag_downloaded_file(&path, record, &self.artwork).await;

        Ok(Acquisition::Downloaded { path, tagged })
    }
}

/// Reads menu choices from any line source.
pub struct Prompt<R, W> {
    reader: R,
    writer: W,
}

impl Prompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// One trimmed line; `None` on end of input, an empty line or `q`.
    pub fn read_line(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.writer, "{}: ", message)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match line.trim() {
            "" | "q" => Ok(None),
            answer => Ok(Some(answer.to_string())),
        }
    }

    /// Asks until the answer is an index below `len` or the user cancels.
    pub fn choose_index(&mut self, message: &str, len: usize) -> Result<Option<usize>> {
        if len == 0 {
            return Ok(None);
        }
        loop {
            let answer = match self.read_line(&format!("{} [0-{}, q to cancel]", message, len - 1))? {
                Some(answer) => answer,
                None => return Ok(None),
            };
            match answer.parse::<usize>() {
                Ok(idx) if idx < len => return Ok(Some(idx)),
                _ => writeln!(self.writer, "Invalid choice '{}'", answer)?,
            }
        }
    }
}

/// Search a song, pick it, pick a video, download and tag.
pub async fn run_song_mode<R: BufRead, W: Write>(
    songbird: &Songbird,
    term: &str,
    prompt: &mut Prompt<R, W>,
) -> Result<Option<Acquisition>> {
    let songs = songbird.find_songs(term, None).await?;
    if songs.is_empty() {
        log::warn!("⚠️ [SONGBIRD] No songs found for '{}'", term);
        return Ok(None);
    }

    print_records(&songs, RECORD_IGNORE_KEYS, prompt.writer())?;
    let song = match prompt.choose_index("Select a song", songs.len())? {
        Some(idx) => &songs[idx],
        None => return Ok(None),
    };

    let links = songbird.video_links_for(song).await?;
    let link = match pick_link(&links, prompt)? {
        Some(link) => link,
        None => return Ok(None),
    };

    songbird.acquire(song, link).await.map(Some)
}

/// Search an album, pick it and acquire every track on it. Each track takes
/// the first video result unless `interactive` is set. Per-track failures
/// are logged and skipped.
pub async fn run_album_mode<R: BufRead, W: Write>(
    songbird: &Songbird,
    term: &str,
    prompt: &mut Prompt<R, W>,
    interactive: bool,
) -> Result<Vec<Acquisition>> {
    let albums = songbird.find_albums(term, None).await?;
    if albums.is_empty() {
        log::warn!("⚠️ [SONGBIRD] No albums found for '{}'", term);
        return Ok(Vec::new());
    }

    print_records(&albums, RECORD_IGNORE_KEYS, prompt.writer())?;
    let album = match prompt.choose_index("Select an album", albums.len())? {
        Some(idx) => &albums[idx],
        None => return Ok(Vec::new()),
    };

    let tracks = songbird.album_tracks(album).await?;
    log::info!("📀 [SONGBIRD] {} has {} track(s)", album.collection_name, tracks.len());

    let mut acquired = Vec::with_capacity(tracks.len());
    for track in &tracks {
        let links = match songbird.video_links_for(track).await {
            Ok(links) => links,
            Err(e) => {
                log::error!("❌ [SONGBIRD] Skipping {}: {}", track.track_name, e);
                continue;
            }
        };

        let link = if interactive {
            writeln!(prompt.writer(), "{} - {}", track.track_number, track.track_name)?;
            pick_link(&links, prompt)?
        } else {
            links.first()
        };
        let Some(link) = link else {
            log::warn!("⚠️ [SONGBIRD] No video chosen for {}", track.track_name);
            continue;
        };

        match songbird.acquire(track, link).await {
            Ok(result) => acquired.push(result),
            Err(e) => log::error!("❌ [SONGBIRD] Failed to acquire {}: {}", track.track_name, e),
        }
    }

    Ok(acquired)
}

fn pick_link<'a, R: BufRead, W: Write>(links: &'a VideoLinks, prompt: &mut Prompt<R, W>) -> Result<Option<&'a VideoLink>> {
    print_indexed(&links.display_list(), prompt.writer())?;
    Ok(prompt
        .choose_index("Select a video", links.len())?
        .and_then(|idx| links.get(idx)))
}

/// Tags a file that is already on disk with the first catalog hit for `term`.
pub async fn tag_existing(songbird: &Songbird, path: &Path, term: &str) -> Result<bool> {
    songbird.validator.validate_file_path(&path.to_string_lossy())?;
    if !path.is_file() {
        return Err(AppError::NotFound(format!("No file at {:?}", path)));
    }
    let songs = songbird.find_songs(term, Some(1)).await?;
    let song = songs
        .first()
        .ok_or_else(|| AppError::NotFound(format!("No catalog match for '{}'", term)))?;
    Ok(tag_downloaded_file(path, song, songbird.artwork()).await)
}
