use reqwest::{Client, StatusCode};

use crate::config::ArtworkConfig;

/// Cover image bytes plus where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub url: String,
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl Artwork {
    pub fn new(url: impl Into<String>, data: Vec<u8>) -> Self {
        let mime_type = sniff_mime(&data).to_string();
        Self {
            url: url.into(),
            data,
            mime_type,
        }
    }
}

/// Image type from magic bytes, JPEG when unknown.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

fn size_width(token: &str) -> u32 {
    token
        .split('x')
        .next()
        .and_then(|w| w.parse().ok())
        .unwrap_or(0)
}

/// Probes the catalog's artwork CDN for the largest available rendition.
#[derive(Debug, Clone)]
pub struct ArtworkFetcher {
    client: Client,
    base_size: String,
    sizes: Vec<String>,
}

impl ArtworkFetcher {
    pub fn new(client: Client, config: &ArtworkConfig) -> Self {
        Self {
            client,
            base_size: config.base_size.clone(),
            sizes: config.sizes.clone(),
        }
    }

    /// Urls to try, largest size first. Duplicates are dropped, so a url
    /// without the base token is tried once.
    pub fn candidate_urls(&self, base_url: &str) -> Vec<String> {
        let mut sizes: Vec<&String> = self.sizes.iter().collect();
        sizes.sort_by_key(|s| std::cmp::Reverse(size_width(s)));

        let mut urls: Vec<String> = Vec::with_capacity(sizes.len());
        for size in sizes {
            let url = base_url.replace(&self.base_size, size);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    pub async fn fetch_best(&self, base_url: &str) -> Option<Artwork> {
        if base_url.is_empty() {
            log::warn!("⚠️ [ARTWORK] Couldn't find album art: record has no artwork url");
            return None;
        }

        for url in self.candidate_urls(base_url) {
            log::debug!("🖼️ [ARTWORK] Trying {}", url);
            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    log::debug!("🖼️ [ARTWORK] Request to {} failed: {}", url, e);
                    continue;
                }
            };

            if response.status() != StatusCode::OK {
                log::debug!("🖼️ [ARTWORK] {} returned {}", url, response.status());
                continue;
            }

            match response.bytes().await {
                Ok(bytes) => {
                    let artwork = Artwork::new(url, bytes.to_vec());
                    log::info!("✅ [ARTWORK] Found album art: {} ({} bytes, {})", artwork.url, artwork.data.len(), artwork.mime_type);
                    return Some(artwork);
                }
                Err(e) => {
                    log::debug!("🖼️ [ARTWORK] Failed to read body of {}: {}", url, e);
                    continue;
                }
            }
        }

        log::warn!("⚠️ [ARTWORK] Couldn't find album art");
        None
    }
}
