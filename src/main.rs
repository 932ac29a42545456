use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use songbird::api::SearchMode;
use songbird::commands::{run_album_mode, run_song_mode, tag_existing, Acquisition, Prompt, Songbird, RECORD_IGNORE_KEYS};
use songbird::config::{AppConfig, AudioFormat};
use songbird::display::{name_plate, print_indexed, print_records};
use songbird::downloader::{DownloadRequest, Downloader, YtDlpDownloader};
use songbird::security::InputValidator;
use songbird::Result;

#[derive(Parser)]
#[command(name = "songbird", version, about = "Find a song in the iTunes catalog, download a matching video's audio and tag it")]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog.
    Search {
        term: String,
        #[arg(long)]
        album: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List the songs of a catalog collection id.
    Lookup {
        id: String,
        #[arg(long, default_value_t = 200)]
        limit: u32,
    },
    /// Print video links for a query.
    Links { query: String },
    /// Download a video's audio to `<output>.<format>`.
    Download {
        url: String,
        output: PathBuf,
        #[arg(long)]
        format: Option<AudioFormat>,
    },
    /// Tag a file with the first catalog match for a search term.
    Tag { file: PathBuf, term: String },
    /// Interactive: search a song, pick a video, download and tag it.
    Get { term: String },
    /// Search an album and acquire all of its tracks.
    Album {
        term: String,
        /// Pick the video for every track instead of taking the first result.
        #[arg(long)]
        interactive: bool,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> AppConfig {
    let loaded = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    match loaded {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            AppConfig::default()
        }
    }
}

fn report(outcome: &Acquisition) {
    match outcome {
        Acquisition::Downloaded { path, tagged: true } => info!("🎉 Saved and tagged {:?}", path),
        Acquisition::Downloaded { path, tagged: false } => log::warn!("⚠️ Saved {:?} but tagging failed", path),
        Acquisition::InLibrary(paths) => info!("📚 Already in library: {:?}", paths),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref());
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Search { term, album, limit } => {
            let songbird = Songbird::new(config)?;
            if album {
                let albums = songbird.find_albums(&term, limit).await?;
                print_records(&albums, RECORD_IGNORE_KEYS, &mut stdout)?;
            } else {
                let songs = songbird.find_songs(&term, limit).await?;
                print_records(&songs, RECORD_IGNORE_KEYS, &mut stdout)?;
            }
        }
        Command::Lookup { id, limit } => {
            let songbird = Songbird::new(config)?;
            let records = songbird.catalog().search(&id, limit, SearchMode::Song, true).await?;
            print_records(&records, RECORD_IGNORE_KEYS, &mut stdout)?;
        }
        Command::Links { query } => {
            let songbird = Songbird::new(config)?;
            let links = songbird.video_links(&query).await?;
            print_indexed(&links.display_list(), &mut stdout)?;
        }
        Command::Download { url, output, format } => {
            let validator = InputValidator::new();
            validator.validate_url(&url)?;
            validator.validate_file_path(&output.to_string_lossy())?;
            let format = format.unwrap_or(config.preferred_format);
            let request = DownloadRequest::new(url, output, format.extension())
                .with_bitrate(config.get_quality_bitrate());
            let path = YtDlpDownloader::from_config(&config.downloader).download(&request).await?;
            info!("🎉 Downloaded {:?}", path);
        }
        Command::Tag { file, term } => {
            let songbird = Songbird::new(config)?;
            if tag_existing(&songbird, &file, &term).await? {
                info!("🎉 Tagged {:?}", file);
            } else {
                log::warn!("⚠️ Could not tag {:?}", file);
            }
        }
        Command::Get { term } => {
            name_plate(&[format!("mode: {}", SearchMode::Song)], &mut stdout)?;
            let songbird = Songbird::new(config)?;
            let mut prompt = Prompt::stdio();
            match run_song_mode(&songbird, &term, &mut prompt).await? {
                Some(outcome) => report(&outcome),
                None => info!("Nothing downloaded"),
            }
        }
        Command::Album { term, interactive } => {
            name_plate(&[format!("mode: {}", SearchMode::Album)], &mut stdout)?;
            let songbird = Songbird::new(config)?;
            let mut prompt = Prompt::stdio();
            let outcomes = run_album_mode(&songbird, &term, &mut prompt, interactive).await?;
            outcomes.iter().for_each(report);
            info!("Acquired {} track(s)", outcomes.len());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}
