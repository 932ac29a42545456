use std::time::Duration;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Proxy};
use crate::errors::Result;

pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Builds the reqwest clients shared by the catalog, artwork and scrape layers.
#[derive(Debug, Clone)]
pub struct HttpPool {
    timeout: Duration,
    proxy: Option<String>,
}

impl HttpPool {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_seconds),
            proxy: None,
        }
    }

    pub fn with_proxy(mut self, proxy_url: Option<&str>) -> Self {
        self.proxy = proxy_url.map(str::to_string);
        self
    }

    fn builder(&self) -> Result<ClientBuilder> {
        let mut builder = ClientBuilder::new()
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(15))
            .user_agent(DESKTOP_USER_AGENT)
            .gzip(true)
            .brotli(true)
            .tcp_keepalive(Duration::from_secs(60));

        if let Some(proxy_url) = &self.proxy {
            log::info!("🌐 [HTTP] Using proxy: {}", proxy_url);
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }

        Ok(builder)
    }

    /// Plain JSON/binary client for API and artwork requests.
    pub fn client(&self) -> Result<Client> {
        Ok(self.builder()?.build()?)
    }

    /// Client for a scrape session: persistent cookies and browser-like headers.
    pub fn session_client(&self, headers: HeaderMap) -> Result<Client> {
        Ok(self
            .builder()?
            .cookie_store(true)
            .default_headers(headers)
            .build()?)
    }
}

impl Default for HttpPool {
    fn default() -> Self {
        Self::new(30)
    }
}
