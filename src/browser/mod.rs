//! Browser session abstraction.
//!
//! `BrowserSession` is the only place the crawler touches the rendering
//! engine. The production implementation drives Chromium over CDP
//! (`chromium.rs`); tests drive a scripted in-memory page (`mock.rs`).

pub mod chromium;
#[cfg(test)]
pub mod mock;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// How to locate an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// A single CSS class name, without the leading dot.
    ClassName(String),
    Tag(String),
    XPath(String),
}

impl By {
    pub fn class(name: &str) -> Self {
        By::ClassName(name.to_string())
    }

    pub fn tag(name: &str) -> Self {
        By::Tag(name.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        By::XPath(expr.to_string())
    }

    /// CSS form of the locator, if it has one.
    pub fn to_css(&self) -> Option<String> {
        match self {
            By::ClassName(c) => Some(format!(".{}", c)),
            By::Tag(t) => Some(t.clone()),
            By::XPath(_) => None,
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            By::ClassName(c) => write!(f, "class={}", c),
            By::Tag(t) => write!(f, "tag={}", t),
            By::XPath(x) => write!(f, "xpath={}", x),
        }
    }
}

/// Opaque handle to an element located in the current page.
///
/// Handles are invalidated by the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub(crate) usize);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no element matches {0}")]
    NotFound(By),

    #[error("stale element handle {0:?}")]
    Stale(ElementRef),

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    #[error("script failed: {0}")]
    Script(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("unsupported locator {0}")]
    Unsupported(By),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

impl BrowserError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BrowserError::NotFound(_))
    }
}

/// Capabilities the crawler needs from a live, scripted page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` in the session's page. Invalidates all element handles.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&mut self) -> Result<String, BrowserError>;

    /// First element matching `by`, searched inside `scope` or the whole page.
    async fn find(&mut self, scope: Option<ElementRef>, by: &By)
        -> Result<ElementRef, BrowserError>;

    /// All elements matching `by` in document order. Empty when nothing matches.
    async fn find_all(
        &mut self,
        scope: Option<ElementRef>,
        by: &By,
    ) -> Result<Vec<ElementRef>, BrowserError>;

    /// Rendered text of the element.
    async fn text(&mut self, el: ElementRef) -> Result<String, BrowserError>;

    async fn attribute(&mut self, el: ElementRef, name: &str)
        -> Result<Option<String>, BrowserError>;

    /// Whether the element is displayed and enabled right now.
    async fn is_clickable(&mut self, el: ElementRef) -> Result<bool, BrowserError>;

    /// Native click on the element.
    async fn click(&mut self, el: ElementRef) -> Result<(), BrowserError>;

    /// Evaluate a script in the page and return its JSON result.
    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Call `function` (a JS function declaration) with `this` bound to `el`.
    async fn call_on(
        &mut self,
        el: ElementRef,
        function: &str,
    ) -> Result<serde_json::Value, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Poll `el` until it is clickable or `timeout` elapses.
pub async fn wait_until_clickable(
    session: &mut dyn BrowserSession,
    el: ElementRef,
    timeout: Duration,
    poll: Duration,
) -> Result<(), BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if session.is_clickable(el).await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(timeout, format!("{:?} to be clickable", el)));
        }
        sleep(poll).await;
    }
}

/// Poll `document.readyState` until the page reports `complete`.
pub async fn wait_for_ready(
    session: &mut dyn BrowserSession,
    timeout: Duration,
    poll: Duration,
) -> Result<(), BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        let state = session.execute_script("document.readyState").await?;
        if state.as_str() == Some("complete") {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(timeout, "document ready".to_string()));
        }
        sleep(poll).await;
    }
}
