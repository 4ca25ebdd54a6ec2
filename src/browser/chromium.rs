//! Chromium-backed session using chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserError, BrowserSession, By, ElementRef};
use crate::config::BrowserSettings;

const CLICKABLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return !this.disabled && r.width > 0 && r.height > 0 \
        && s.visibility !== 'hidden' && s.display !== 'none'; }";

/// One Chromium instance driving a single tab.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    elements: Vec<Element>,
    page_load_timeout: Duration,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank tab.
    pub async fn launch(settings: &BrowserSettings, page_load_timeout: Duration) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .request_timeout(page_load_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to launch Chromium: {e}"))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("cdp handler event error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow::anyhow!("failed to open tab: {e}"))?;

        Ok(Self {
            browser,
            page,
            handler,
            elements: Vec::new(),
            page_load_timeout,
        })
    }

    fn element(&self, el: ElementRef) -> Result<&Element, BrowserError> {
        self.elements.get(el.0).ok_or(BrowserError::Stale(el))
    }

    fn register(&mut self, found: Vec<Element>) -> Vec<ElementRef> {
        let start = self.elements.len();
        self.elements.extend(found);
        (start..self.elements.len()).map(ElementRef).collect()
    }

    async fn locate(
        &self,
        scope: Option<ElementRef>,
        by: &By,
    ) -> Result<Vec<Element>, BrowserError> {
        let found = match (scope, by.to_css()) {
            (None, Some(css)) => self.page.find_elements(css).await,
            (Some(el), Some(css)) => self.element(el)?.find_elements(css).await,
            (None, None) => match by {
                By::XPath(x) => self.page.find_xpaths(x.as_str()).await,
                _ => return Err(BrowserError::Unsupported(by.clone())),
            },
            (Some(_), None) => return Err(BrowserError::Unsupported(by.clone())),
        };
        lookup_result(by, found)
    }
}

/// A lookup that matches nothing surfaces as a CDP error on some pages; only
/// that case becomes an empty result.
fn lookup_result<T, E: std::fmt::Display>(by: &By, found: Result<Vec<T>, E>) -> Result<Vec<T>, BrowserError> {
    match found {
        Ok(found) => Ok(found),
        Err(e) if is_no_match(&e.to_string()) => {
            debug!("lookup {} matched nothing: {e}", by);
            Ok(Vec::new())
        }
        Err(e) => Err(protocol(format!("lookup {by}: {e}"))),
    }
}

fn is_no_match(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["could not find node", "no node", "no search result"]
        .iter()
        .any(|m| message.contains(m))
}

fn protocol(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.elements.clear();
        let nav_err = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };
        match tokio::time::timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(nav_err(e.to_string())),
            Err(_) => Err(nav_err(format!(
                "timed out after {}s",
                self.page_load_timeout.as_secs()
            ))),
        }
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.page.url().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn find(
        &mut self,
        scope: Option<ElementRef>,
        by: &By,
    ) -> Result<ElementRef, BrowserError> {
        let mut found = self.locate(scope, by).await?;
        if found.is_empty() {
            return Err(BrowserError::NotFound(by.clone()));
        }
        found.truncate(1);
        Ok(self.register(found)[0])
    }

    async fn find_all(
        &mut self,
        scope: Option<ElementRef>,
        by: &By,
    ) -> Result<Vec<ElementRef>, BrowserError> {
        let found = self.locate(scope, by).await?;
        Ok(self.register(found))
    }

    async fn text(&mut self, el: ElementRef) -> Result<String, BrowserError> {
        let text = self.element(el)?.inner_text().await.map_err(protocol)?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(
        &mut self,
        el: ElementRef,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.element(el)?.attribute(name).await.map_err(protocol)
    }

    async fn is_clickable(&mut self, el: ElementRef) -> Result<bool, BrowserError> {
        let value = self.call_on(el, CLICKABLE_JS).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&mut self, el: ElementRef) -> Result<(), BrowserError> {
        self.element(el)?.click().await.map_err(protocol)?;
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn call_on(
        &mut self,
        el: ElementRef,
        function: &str,
    ) -> Result<serde_json::Value, BrowserError> {
        let returns = self
            .element(el)?
            .call_js_fn(function, false)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.elements.clear();
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("browser did not exit cleanly: {e}");
        }
        self.handler.abort();
        Ok(())
    }
}
