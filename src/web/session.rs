use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::downloader::http_pool::{HttpPool, DESKTOP_USER_AGENT};
use crate::errors::{AppError, Result};
use crate::web::render::{FetchedPage, PageRenderer, RenderOptions};
use crate::web::{FormInputSet, RenderedPage, SearchForm, SearchFormRequest};

/// Headers copied from a desktop browser submitting a search.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pairs = [
        ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
        ("accept-language", "en-US,en;q=0.5"),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "cross-site"),
        ("upgrade-insecure-requests", "1"),
        ("user-agent", DESKTOP_USER_AGENT),
    ];
    for (name, value) in pairs {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
}

/// A cookie-keeping HTTP session plus a renderer, used for one site interaction.
///
/// Create one per search flow and call [`ScrapeSession::close`] when done.
pub struct ScrapeSession {
    name: String,
    root_url: String,
    client: Client,
    renderer: Arc<dyn PageRenderer>,
    current_url: Option<Url>,
}

impl ScrapeSession {
    pub fn new(
        name: impl Into<String>,
        root_url: impl Into<String>,
        headers: Option<HeaderMap>,
        pool: &HttpPool,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self> {
        let name = name.into();
        let root_url = root_url.into();
        let client = pool.session_client(headers.unwrap_or_else(default_headers))?;

        log::debug!("🌐 [SESSION] Opened '{}' session for {} (renderer: {})", name, root_url, renderer.get_name());
        Ok(Self {
            name,
            root_url,
            client,
            renderer,
            current_url: None,
        })
    }

    /// Url of the last page this session loaded.
    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    /// Loads `form_url` and returns its named inputs with `payload` overlaid.
    pub async fn get_form_inputs(
        &mut self,
        form_url: &str,
        payload: &[(String, String)],
        log_calls: bool,
    ) -> Result<FormInputSet> {
        let page = self.fetch(form_url, &[]).await.map_err(|e| {
            log::error!("❌ [SESSION] Error submitting request to: {}: {}", form_url, e);
            e
        })?;

        if log_calls {
            log::info!("🌐 [SESSION] Loaded web page: {}!", page.url);
        }

        let inputs = FormInputSet::discover(&page.html)
            .overlay(payload.iter().map(|(k, v)| (k.clone(), v.clone())));

        if log_calls {
            log::info!("📝 [SESSION] Auto filled the web form with inputs: {:?}", inputs.as_query());
        }

        Ok(inputs)
    }

    async fn fetch(&mut self, url: &str, query: &[(&str, &str)]) -> Result<FetchedPage> {
        let response = self.client.get(url).query(query).send().await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();
        // Reading the body releases the connection.
        let html = response.text().await?;

        self.current_url = Some(final_url.clone());
        Ok(FetchedPage {
            url: final_url,
            status,
            html,
        })
    }

    pub async fn close(self) {
        log::debug!("🌐 [SESSION] Closed '{}' session", self.name);
        drop(self.client);
    }
}

#[async_trait]
impl SearchForm for ScrapeSession {
    async fn enter_search_form(&mut self, request: &SearchFormRequest, log_calls: bool) -> Result<RenderedPage> {
        let form_url = request.form_url.clone().unwrap_or_else(|| self.root_url.clone());
        let inputs = self.get_form_inputs(&form_url, &request.payload, log_calls).await?;

        let page = self.fetch(&request.search_url, &inputs.as_query()).await.map_err(|e| {
            log::error!("❌ [SESSION] Error submitting request to: {}: {}", request.search_url, e);
            e
        })?;

        log::debug!("🖥️ [SESSION] Rendering html for: {}", page.url);
        let html = render(self.renderer.as_ref(), &page, &request.render).await?;
        log::debug!("✅ [SESSION] Rendering complete for: {}", page.url);

        Ok(RenderedPage {
            url: page.url,
            status: page.status,
            html,
        })
    }
}

async fn render(renderer: &dyn PageRenderer, page: &FetchedPage, options: &RenderOptions) -> Result<String> {
    renderer.render(page, options).await.map_err(|e| match e {
        e @ AppError::Render(_) => e,
        other => AppError::Render(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::render::StaticRenderer;
    use mockito::Matcher;

    const HOME: &str = r#"<html><body><form action="/results">
        <input name="search_query">
        <input type="hidden" name="sp">
        <input type="submit">
    </form></body></html>"#;

    const RESULTS: &str = r#"<html><body>
        <a id="video-title" title="Billy Joel - Piano Man" href="/watch?v=gxEPV4kolz0"></a>
    </body></html>"#;

    fn session_for(server: &mockito::ServerGuard) -> ScrapeSession {
        ScrapeSession::new("test", server.url(), None, &HttpPool::new(5), Arc::new(StaticRenderer)).unwrap()
    }

    #[tokio::test]
    async fn test_enter_search_form_submits_merged_inputs() {
        let mut server = mockito::Server::new_async().await;
        let home = server.mock("GET", "/").with_status(200).with_body(HOME).create_async().await;
        let results = server
            .mock("GET", "/results")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "billy joel".into()),
                Matcher::UrlEncoded("sp".into(), "".into()),
            ]))
            .with_status(200)
            .with_body(RESULTS)
            .create_async()
            .await;

        let mut session = session_for(&server);
        let request = SearchFormRequest {
            search_url: format!("{}/results", server.url()),
            form_url: None,
            payload: vec![("search_query".to_string(), "billy joel".to_string())],
            render: RenderOptions::default(),
        };

        let page = session.enter_search_form(&request, true).await.unwrap();
        home.assert_async().await;
        results.assert_async().await;

        assert_eq!(page.status, 200);
        assert_eq!(page.select("#video-title").unwrap().len(), 1);
        assert_eq!(session.current_url().map(|u| u.path()), Some("/results"));
        session.close().await;
    }

    #[tokio::test]
    async fn test_form_inputs_from_explicit_form_url() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/form").with_status(200).with_body(HOME).create_async().await;

        let mut session = session_for(&server);
        let inputs = session
            .get_form_inputs(&format!("{}/form", server.url()), &[("sp".to_string(), "x".to_string())], false)
            .await
            .unwrap();

        assert_eq!(inputs.get("search_query"), Some(""));
        assert_eq!(inputs.get("sp"), Some("x"));
        assert_eq!(inputs.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let mut session = ScrapeSession::new(
            "test",
            "http://127.0.0.1:1",
            None,
            &HttpPool::new(2),
            Arc::new(StaticRenderer),
        )
        .unwrap();

        let request = SearchFormRequest {
            search_url: "http://127.0.0.1:1/results".to_string(),
            form_url: None,
            payload: Vec::new(),
            render: RenderOptions::default(),
        };
        let err = session.enter_search_form(&request, false).await.unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
    }

    #[test]
    fn test_default_headers_look_like_a_browser() {
        let headers = default_headers();
        assert_eq!(headers.get("user-agent").unwrap(), DESKTOP_USER_AGENT);
        assert!(headers.contains_key("accept"));
    }

    #[tokio::test]
    #[ignore = "requires network access and a headless chromium"]
    async fn test_live_youtube_search_form() {
        let renderer = Arc::new(crate::web::render::ChromiumRenderer::new("chromium"));
        let mut session = ScrapeSession::new("youtube", "https://www.youtube.com", None, &HttpPool::default(), renderer).unwrap();
        let request = SearchFormRequest {
            search_url: "https://www.youtube.com/results".to_string(),
            form_url: None,
            payload: vec![("search_query".to_string(), "billy joel".to_string())],
            render: RenderOptions::default(),
        };
        let page = session.enter_search_form(&request, true).await.unwrap();
        assert_eq!(page.status, 200);
        session.close().await;
    }
}
