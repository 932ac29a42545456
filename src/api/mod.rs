pub mod itunes;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use itunes::CatalogClient;

/// Which catalog entity to query, sent as the `entity` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Song,
    Album,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Song => "song",
            SearchMode::Album => "album",
        }
    }

    pub fn values() -> [&'static str; 2] {
        [SearchMode::Album.as_str(), SearchMode::Song.as_str()]
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog collection ids arrive as numbers, but older payloads carry strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionId {
    Numeric(u64),
    Text(String),
}

impl Default for CollectionId {
    fn default() -> Self {
        CollectionId::Text(String::new())
    }
}

impl CollectionId {
    pub fn is_empty(&self) -> bool {
        matches!(self, CollectionId::Text(s) if s.is_empty())
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionId::Numeric(id) => write!(f, "{}", id),
            CollectionId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSongRecord {
    pub track_name: String,
    pub artist_name: String,
    pub collection_name: String,
    #[serde(rename = "artworkUrl100")]
    pub artwork_url: String,
    pub primary_genre_name: String,
    pub track_number: u32,
    pub track_count: u32,
    pub disc_number: u32,
    pub disc_count: u32,
    #[serde(default)]
    pub collection_id: CollectionId,
    #[serde(default)]
    pub collection_artist_name: Option<String>,
    /// Reduced to the year by the catalog client.
    pub release_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAlbumRecord {
    pub artist_name: String,
    pub collection_name: String,
    pub track_count: u32,
    #[serde(default)]
    pub collection_id: CollectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogRecord {
    Song(CatalogSongRecord),
    Album(CatalogAlbumRecord),
}

impl CatalogRecord {
    pub fn into_song(self) -> Option<CatalogSongRecord> {
        match self {
            CatalogRecord::Song(song) => Some(song),
            CatalogRecord::Album(_) => None,
        }
    }

    pub fn into_album(self) -> Option<CatalogAlbumRecord> {
        match self {
            CatalogRecord::Album(album) => Some(album),
            CatalogRecord::Song(_) => None,
        }
    }
}

/// "2016-06-01T07:00:00Z" -> "2016"
pub fn release_year(date: &str) -> &str {
    date.split('-').next().unwrap_or(date)
}
