use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use url::Url;

use crate::errors::{AppError, Result};

/// Budgets for a single render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Upper bound for the whole render.
    pub timeout: Duration,
    /// Delay before the render starts.
    pub wait: Duration,
    /// Time given to page scripts after load.
    pub sleep: Duration,
    /// Navigate to the page url again instead of rendering the fetched html.
    pub reload: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            wait: Duration::from_millis(200),
            sleep: Duration::from_secs(1),
            reload: true,
        }
    }
}

/// A fetched page, before any script has run.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    pub html: String,
}

/// Executes a page's scripts and returns the resulting markup.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, page: &FetchedPage, options: &RenderOptions) -> Result<String>;
    fn get_name(&self) -> &str;
}

/// Hands the page to a headless Chromium and reads back the serialized DOM.
pub struct ChromiumRenderer {
    chromium_path: String,
}

impl ChromiumRenderer {
    pub fn new(chromium_path: impl Into<String>) -> Self {
        Self {
            chromium_path: chromium_path.into(),
        }
    }

    pub(crate) fn build_args(&self, target: &str, options: &RenderOptions) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--hide-scrollbars".to_string(),
            "--mute-audio".to_string(),
            format!("--virtual-time-budget={}", options.sleep.as_millis()),
            "--dump-dom".to_string(),
            target.to_string(),
        ]
    }

    async fn run(&self, target: &str, options: &RenderOptions) -> Result<String> {
        let args = self.build_args(target, options);
        log::debug!("🖥️ [RENDER] Running {} {:?}", self.chromium_path, args);

        let child = Command::new(&self.chromium_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Render(format!("Failed to start {}: {}", self.chromium_path, e)))?;

        let budget = options.timeout + options.sleep;
        let output = tokio::time::timeout(budget, child.wait_with_output())
            .await
            .map_err(|_| AppError::Render(format!("Render of {} timed out after {:?}", target, budget)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Render(format!("{} exited with {}: {}", self.chromium_path, output.status, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, page: &FetchedPage, options: &RenderOptions) -> Result<String> {
        if !options.wait.is_zero() {
            tokio::time::sleep(options.wait).await;
        }

        if options.reload {
            return self.run(page.url.as_str(), options).await;
        }

        // Snapshot must outlive the browser process.
        let mut snapshot = tempfile::Builder::new()
            .prefix("songbird-render-")
            .suffix(".html")
            .tempfile()?;
        snapshot.write_all(with_base_href(&page.html, &page.url).as_bytes())?;
        snapshot.flush()?;

        let target = Url::from_file_path(snapshot.path())
            .map_err(|_| AppError::Render(format!("Invalid snapshot path: {:?}", snapshot.path())))?;
        self.run(target.as_str(), options).await
    }

    fn get_name(&self) -> &str {
        "chromium"
    }
}

/// Returns the fetched markup untouched.
pub struct StaticRenderer;

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, page: &FetchedPage, _options: &RenderOptions) -> Result<String> {
        Ok(page.html.clone())
    }

    fn get_name(&self) -> &str {
        "static"
    }
}

/// Relative links in a snapshot must still resolve against the original site.
fn with_base_href(html: &str, url: &Url) -> String {
    let base = format!("<base href=\"{}\">", url);
    let lower = html.to_ascii_lowercase();
    match lower.find("<head") {
        Some(start) => match lower[start..].find('>') {
            Some(end) => {
                let insert_at = start + end + 1;
                format!("{}{}{}", &html[..insert_at], base, &html[insert_at..])
            }
            None => format!("{}{}", base, html),
        },
        None => format!("{}{}", base, html),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> FetchedPage {
        FetchedPage {
            url: Url::parse("https://www.youtube.com/results?search_query=jolene").unwrap(),
            status: 200,
            html: html.to_string(),
        }
    }

    #[test]
    fn test_base_href_goes_inside_head() {
        let html = "<html><head><title>x</title></head><body></body></html>";
        let out = with_base_href(html, &page(html).url);
        assert!(out.starts_with("<html><head><base href=\"https://www.youtube.com/results?search_query=jolene\"><title>"));
    }

    #[test]
    fn test_base_href_without_head() {
        let out = with_base_href("<p>hi</p>", &page("").url);
        assert!(out.starts_with("<base href="));
        assert!(out.ends_with("<p>hi</p>"));
    }

    #[test]
    fn test_chromium_args_carry_budget_and_target() {
        let renderer = ChromiumRenderer::new("chromium");
        let options = RenderOptions {
            sleep: Duration::from_millis(1500),
            ..RenderOptions::default()
        };
        let args = renderer.build_args("https://example.com/", &options);
        assert!(args.contains(&"--dump-dom".to_string()));
        assert!(args.contains(&"--virtual-time-budget=1500".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn test_static_renderer_returns_html() {
        let html = "<a id=\"video-title\" title=\"t\" href=\"/watch?v=1\"></a>";
        let out = StaticRenderer.render(&page(html), &RenderOptions::default()).await.unwrap();
        assert_eq!(out, html);
    }

    #[tokio::test]
    async fn test_missing_browser_is_a_render_error() {
        let renderer = ChromiumRenderer::new("/nonexistent/chromium-binary");
        let options = RenderOptions {
            wait: Duration::ZERO,
            ..RenderOptions::default()
        };
        let err = renderer.render(&page("<html></html>"), &options).await.unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }
}
