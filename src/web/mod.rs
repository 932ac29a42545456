pub mod form;
pub mod render;
pub mod session;

use std::collections::BTreeMap;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::errors::{AppError, Result};
use render::RenderOptions;

pub use form::FormInputSet;
pub use session::ScrapeSession;

/// One form-entry + search round trip.
#[derive(Debug, Clone)]
pub struct SearchFormRequest {
    pub search_url: String,
    /// Page holding the form; the session's root url when `None`.
    pub form_url: Option<String>,
    pub payload: Vec<(String, String)>,
    pub render: RenderOptions,
}

/// A page after rendering.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    pub status: u16,
    pub html: String,
}

/// An element pulled out of a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    pub html: String,
    pub attrs: BTreeMap<String, String>,
}

impl PageElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

impl RenderedPage {
    /// Elements matching a CSS selector, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<PageElement>> {
        let selector = Selector::parse(selector)
            .map_err(|e| AppError::Scrape(format!("Invalid selector '{}': {}", selector, e)))?;
        let document = Html::parse_document(&self.html);

        Ok(document
            .select(&selector)
            .map(|element| PageElement {
                html: element.html(),
                attrs: element
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .collect())
    }
}

/// Anything that can drive a site's search form to a rendered result page.
#[async_trait]
pub trait SearchForm: Send {
    async fn enter_search_form(&mut self, request: &SearchFormRequest, log_calls: bool) -> Result<RenderedPage>;
}
