use std::sync::Arc;

use reqwest::header::{HeaderValue, REFERER};
use url::Url;

use crate::downloader::http_pool::HttpPool;
use crate::errors::{AppError, Result};
use crate::web::render::{PageRenderer, RenderOptions};
use crate::web::session::default_headers;
use crate::web::{PageElement, ScrapeSession, SearchForm, SearchFormRequest};

/// A search result on the video site.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoLink {
    pub title: String,
    pub url: String,
    /// The element the link was read from.
    pub element: PageElement,
}

impl VideoLink {
    pub fn display(&self) -> String {
        format!("{} - {}", self.title, self.url)
    }
}

/// Video links in the order the site returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoLinks {
    links: Vec<VideoLink>,
}

impl VideoLinks {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VideoLink> {
        self.links.get(index)
    }

    pub fn first(&self) -> Option<&VideoLink> {
        self.links.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VideoLink> {
        self.links.iter()
    }

    /// `"<title> - <url>"` per link, index-aligned with [`VideoLinks::elements`].
    pub fn display_list(&self) -> Vec<String> {
        self.links.iter().map(VideoLink::display).collect()
    }

    pub fn elements(&self) -> Vec<&PageElement> {
        self.links.iter().map(|l| &l.element).collect()
    }
}

impl IntoIterator for VideoLinks {
    type Item = VideoLink;
    type IntoIter = std::vec::IntoIter<VideoLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

#[derive(Debug, Clone)]
pub struct HarvestRequest {
    pub home_url: String,
    pub search_url: String,
    pub payload: Vec<(String, String)>,
    pub title_selector: String,
    pub render: RenderOptions,
    pub retry_count: u32,
}

impl HarvestRequest {
    pub fn new(home_url: impl Into<String>, search_url: impl Into<String>, payload: Vec<(String, String)>) -> Self {
        Self {
            home_url: home_url.into(),
            search_url: search_url.into(),
            payload,
            title_selector: "#video-title".to_string(),
            render: RenderOptions::default(),
            retry_count: 3,
        }
    }
}

/// Runs the search form until the title marker shows up, at most
/// `retry_count` times. Empty results count as a failed attempt because
/// script-injected results do not always make it into the render.
pub async fn harvest_links<S: SearchForm + ?Sized>(session: &mut S, request: &HarvestRequest) -> Result<VideoLinks> {
    let form_request = SearchFormRequest {
        search_url: request.search_url.clone(),
        form_url: None,
        payload: request.payload.clone(),
        render: request.render.clone(),
    };

    let mut tries = 0;
    // Only the first attempt logs the request details.
    let mut log_attempts = true;
    let mut matches = Vec::new();

    while tries < request.retry_count {
        let page = match session.enter_search_form(&form_request, log_attempts).await {
            Ok(page) => page,
            Err(e @ AppError::Render(_)) => return Err(e),
            Err(e) => {
                log::error!(
                    "❌ [HARVEST] Error occurred performing a search for {:?} against url {}: {}. Please try again.",
                    request.payload, request.search_url, e
                );
                tries += 1;
                log_attempts = false;
                continue;
            }
        };

        matches = page.select(&request.title_selector)?;
        if matches.is_empty() {
            log::warn!("⚠️ [HARVEST] {}:{}.", tries + 1, request.retry_count);
            tries += 1;
            log_attempts = false;
        } else {
            break;
        }
    }

    if tries >= request.retry_count {
        log::error!("❌ [HARVEST] Failed to get links from {} after {} tries.", request.home_url, request.retry_count);
        return Err(AppError::RetriesExhausted {
            url: request.home_url.clone(),
            retries: request.retry_count,
        });
    }

    build_links(&request.home_url, matches)
}

fn build_links(home_url: &str, elements: Vec<PageElement>) -> Result<VideoLinks> {
    let base = Url::parse(home_url)?;
    let mut links = Vec::with_capacity(elements.len());

    for element in elements {
        let (title, href) = match (element.attr("title"), element.attr("href")) {
            (Some(title), Some(href)) => (title.to_string(), href.to_string()),
            _ => {
                log::debug!("🔗 [HARVEST] Skipping element without title/href: {}", element.html);
                continue;
            }
        };

        let url = match base.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::debug!("🔗 [HARVEST] Skipping unusable href '{}': {}", href, e);
                continue;
            }
        };

        links.push(VideoLink { title, url, element });
    }

    log::info!("✅ [HARVEST] Found {} video links", links.len());
    Ok(VideoLinks { links })
}

/// Opens a session on `home_url`, harvests the links and closes the session
/// whatever the outcome.
pub async fn get_video_links(
    request: &HarvestRequest,
    pool: &HttpPool,
    renderer: Arc<dyn PageRenderer>,
) -> Result<VideoLinks> {
    let mut headers = default_headers();
    if let Ok(referer) = HeaderValue::from_str(&request.home_url) {
        headers.insert(REFERER, referer);
    }

    let mut session = ScrapeSession::new("youtube", request.home_url.clone(), Some(headers), pool, renderer)?;
    let result = harvest_links(&mut session, request).await;
    session.close().await;
    result
}
