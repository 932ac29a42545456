use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::api::{release_year, CatalogAlbumRecord, CatalogRecord, CatalogSongRecord, SearchMode};
use crate::config::CatalogConfig;
use crate::errors::{AppError, Result};

/// Client for the iTunes search/lookup endpoints.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    search_url: String,
    lookup_url: String,
}

impl CatalogClient {
    pub fn new(client: Client, config: &CatalogConfig) -> Self {
        Self {
            client,
            search_url: config.search_url.clone(),
            lookup_url: config.lookup_url.clone(),
        }
    }

    /// Queries the catalog once.
    ///
    /// With `lookup` set, `term` is treated as a catalog id and sent to the
    /// lookup endpoint instead of the free-text search endpoint. Elements that
    /// do not fit the record shape for `mode` are skipped with a warning.
    pub async fn search(&self, term: &str, limit: u32, mode: SearchMode, lookup: bool) -> Result<Vec<CatalogRecord>> {
        let (url, key) = if lookup {
            (&self.lookup_url, "id")
        } else {
            (&self.search_url, "term")
        };
        let limit = limit.to_string();

        let response = self.client
            .get(url)
            .query(&[(key, term), ("entity", mode.as_str()), ("limit", limit.as_str())])
            .send()
            .await?;

        log::info!("🔍 [CATALOG] Connected to {}", response.url());

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ [CATALOG] Something went wrong trying to connect to the catalog server.");
            log::error!("❌ [CATALOG] Code: {}, Body: {}", status.as_u16(), body);
            return Err(AppError::Api { status: status.as_u16(), body });
        }

        let json: Value = response.json().await?;
        parse_results(&json, mode)
    }

    pub async fn search_songs(&self, term: &str, limit: u32) -> Result<Vec<CatalogSongRecord>> {
        Ok(self.search(term, limit, SearchMode::Song, false).await?
            .into_iter()
            .filter_map(CatalogRecord::into_song)
            .collect())
    }

    pub async fn search_albums(&self, term: &str, limit: u32) -> Result<Vec<CatalogAlbumRecord>> {
        Ok(self.search(term, limit, SearchMode::Album, false).await?
            .into_iter()
            .filter_map(CatalogRecord::into_album)
            .collect())
    }

    /// Songs on `album`, looked up by its collection id.
    pub async fn lookup_album_tracks(&self, album: &CatalogAlbumRecord) -> Result<Vec<CatalogSongRecord>> {
        if album.collection_id.is_empty() {
            return Err(AppError::Validation(format!(
                "Album '{}' has no collection id to look up",
                album.collection_name
            )));
        }

        Ok(self.search(&album.collection_id.to_string(), album.track_count, SearchMode::Song, true).await?
            .into_iter()
            .filter_map(CatalogRecord::into_song)
            .collect())
    }
}

pub(crate) fn parse_results(json: &Value, mode: SearchMode) -> Result<Vec<CatalogRecord>> {
    let results = json["results"]
        .as_array()
        .ok_or_else(|| AppError::Parse("catalog response has no 'results' array".to_string()))?;

    let mut parsed = Vec::with_capacity(results.len());
    for (index, result) in results.iter().enumerate() {
        match parse_record(result, mode) {
            Ok(record) => parsed.push(record),
            Err(e) => log::warn!(
                "⚠️ [CATALOG] Skipping the display of result at index [{}] as it could not be loaded into expected format: {}",
                index, e
            ),
        }
    }

    Ok(parsed)
}

fn parse_record(value: &Value, mode: SearchMode) -> std::result::Result<CatalogRecord, serde_json::Error> {
    match mode {
        SearchMode::Song => {
            let mut song = CatalogSongRecord::deserialize(value)?;
            song.release_date = release_year(&song.release_date).to_string();
            Ok(CatalogRecord::Song(song))
        }
        SearchMode::Album => Ok(CatalogRecord::Album(CatalogAlbumRecord::deserialize(value)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CollectionId;
    use mockito::Matcher;
    use serde_json::json;

    fn song_json(name: &str, date: &str) -> Value {
        json!({
            "wrapperType": "track",
            "trackName": name,
            "artistName": "Dolly Parton",
            "collectionName": "Jolene",
            "artworkUrl100": "https://is1-ssl.mzstatic.com/image/100x100bb.jpg",
            "primaryGenreName": "Country",
            "trackNumber": 1,
            "trackCount": 10,
            "discNumber": 1,
            "discCount": 1,
            "collectionId": 123456,
            "releaseDate": date
        })
    }

    fn client_for(server: &mockito::ServerGuard) -> CatalogClient {
        let config = CatalogConfig {
            search_url: format!("{}/search", server.url()),
            lookup_url: format!("{}/lookup", server.url()),
            default_limit: 20,
        };
        CatalogClient::new(Client::new(), &config)
    }

    #[test]
    fn test_song_release_date_is_reduced_to_year() {
        let json = json!({ "results": [song_json("Jolene", "2016-06-01")] });
        let records = parse_results(&json, SearchMode::Song).unwrap();
        let song = records.into_iter().next().and_then(CatalogRecord::into_song).unwrap();
        assert_eq!(song.release_date, "2016");
    }

    #[test]
    fn test_malformed_elements_are_skipped() {
        let json = json!({ "results": [
            song_json("First", "1974-02-04T08:00:00Z"),
            { "wrapperType": "collection", "collectionName": "Jolene" },
            { "trackName": "Missing fields" },
            song_json("Second", "1974-02-04T08:00:00Z"),
        ]});

        let records = parse_results(&json, SearchMode::Song).unwrap();
        let names: Vec<String> = records
            .into_iter()
            .filter_map(CatalogRecord::into_song)
            .map(|s| s.track_name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_album_mode_parses_album_shape() {
        let json = json!({ "results": [
            { "artistName": "Dolly Parton", "collectionName": "Jolene", "trackCount": 10, "collectionId": 99 },
            { "artistName": "No track count", "collectionName": "x" },
        ]});
        let records = parse_results(&json, SearchMode::Album).unwrap();
        assert_eq!(records.len(), 1);
        let album = records.into_iter().next().and_then(CatalogRecord::into_album).unwrap();
        assert_eq!(album.collection_id, CollectionId::Numeric(99));
        assert_eq!(album.track_count, 10);
    }

    #[test]
    fn test_missing_results_is_a_parse_error() {
        let err = parse_results(&json!({ "resultCount": 0 }), SearchMode::Song).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[tokio::test]
    async fn test_search_sends_term_entity_and_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("term".into(), "jolene".into()),
                Matcher::UrlEncoded("entity".into(), "song".into()),
                Matcher::UrlEncoded("limit".into(), "20".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "results": [song_json("Jolene", "1974-02-04T08:00:00Z")] }).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let songs = client.search_songs("jolene", 20).await.unwrap();

        mock.assert_async().await;
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].release_date, "1974");
    }

    #[tokio::test]
    async fn test_lookup_uses_id_parameter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/lookup")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "123456".into()),
                Matcher::UrlEncoded("entity".into(), "song".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(json!({ "results": [
                { "wrapperType": "collection", "collectionId": 123456, "collectionName": "Jolene" },
                song_json("Jolene", "1974-02-04T08:00:00Z"),
                song_json("When Someone Wants to Leave", "1974-02-04T08:00:00Z"),
            ]}).to_string())
            .create_async()
            .await;

        let album = CatalogAlbumRecord {
            artist_name: "Dolly Parton".to_string(),
            collection_name: "Jolene".to_string(),
            track_count: 2,
            collection_id: CollectionId::Numeric(123456),
        };

        let client = client_for(&server);
        let songs = client.lookup_album_tracks(&album).await.unwrap();

        mock.assert_async().await;
        assert_eq!(songs.len(), 2);
        assert!(songs.len() as u32 <= album.track_count);
    }

    #[tokio::test]
    async fn test_non_200_is_a_hard_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.search("jolene", 5, SearchMode::Song, false).await.unwrap_err();

        mock.assert_async().await;
        match err {
            AppError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    #[ignore = "requires network access to the iTunes API"]
    async fn test_live_song_search() {
        let client = CatalogClient::new(Client::new(), &CatalogConfig::default());
        let songs = client.search_songs("jolene", 20).await.unwrap();
        assert!(!songs.is_empty());
        assert!(!songs[0].track_name.is_empty());
        assert_eq!(songs[0].release_date.len(), 4);
        assert!(songs[0].release_date.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    #[ignore = "requires network access to the iTunes API"]
    async fn test_live_album_lookup() {
        let client = CatalogClient::new(Client::new(), &CatalogConfig::default());
        let albums = client.search_albums("jolene", 20).await.unwrap();
        let album = albums.first().expect("at least one album");
        let songs = client.lookup_album_tracks(album).await.unwrap();
        assert!(!songs.is_empty());
        assert!(songs.len() as u32 <= album.track_count);
    }
}
