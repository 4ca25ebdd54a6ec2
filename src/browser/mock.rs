//! Scripted in-memory page for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::{BrowserError, BrowserSession, By, ElementRef};

#[derive(Debug, Clone, Default)]
pub struct MockNode {
    tag: String,
    name: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    attrs: HashMap<String, String>,
    children: Vec<MockNode>,
    hidden: bool,
    fail_text: bool,
    fail_attrs: bool,
}

impl MockNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// Label recorded in `MockSession::clicks`.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, node: MockNode) -> Self {
        self.children.push(node);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }

    pub fn failing_attrs(mut self) -> Self {
        self.fail_attrs = true;
        self
    }

    fn matches(&self, by: &By) -> Result<bool, BrowserError> {
        match by {
            By::ClassName(c) => Ok(self.classes.iter().any(|x| x == c)),
            By::Tag(t) => Ok(self.tag == *t),
            By::XPath(_) => Err(BrowserError::Unsupported(by.clone())),
        }
    }

    fn rendered_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        for child in &self.children {
            let t = child.rendered_text();
            if !t.is_empty() {
                parts.push(t);
            }
        }
        parts.join("\n")
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| self.tag.clone())
    }
}

#[derive(Debug, Clone)]
pub struct MockPage {
    url: String,
    root: MockNode,
    xpaths: HashMap<String, Vec<usize>>,
    failing_scripts: bool,
}

impl MockPage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            root: MockNode::new("html"),
            xpaths: HashMap::new(),
            failing_scripts: false,
        }
    }

    pub fn child(mut self, node: MockNode) -> Self {
        self.root.children.push(node);
        self
    }

    /// Register `expr` as resolving to the node at `path` (child indices from the root).
    pub fn xpath(mut self, expr: &str, path: &[usize]) -> Self {
        self.xpaths.insert(expr.to_string(), path.to_vec());
        self
    }

    /// Every page-level script throws.
    pub fn failing_scripts(mut self) -> Self {
        self.failing_scripts = true;
        self
    }

    fn node(&self, path: &[usize]) -> Option<&MockNode> {
        let mut node = &self.root;
        for &i in path {
            node = node.children.get(i)?;
        }
        Some(node)
    }
}

#[derive(Debug, Default)]
pub struct MockSession {
    pages: HashMap<String, MockPage>,
    current: Option<MockPage>,
    handles: Vec<Vec<usize>>,
    failing_navigations: HashSet<String>,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub scripts: Vec<String>,
    pub closed: bool,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: MockPage) -> Self {
        self.pages.insert(page.url.clone(), page);
        self
    }

    pub fn failing_navigation(mut self, url: &str) -> Self {
        self.failing_navigations.insert(url.to_string());
        self
    }

    /// Navigations whose URL starts with `prefix`.
    pub fn visits(&self, prefix: &str) -> Vec<&str> {
        self.navigations
            .iter()
            .filter(|u| u.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    fn current(&self) -> Result<&MockPage, BrowserError> {
        self.current
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("no page loaded".to_string()))
    }

    fn resolve(&self, el: ElementRef) -> Result<&MockNode, BrowserError> {
        let path = self.handles.get(el.0).ok_or(BrowserError::Stale(el))?;
        self.current()?.node(path).ok_or(BrowserError::Stale(el))
    }

    fn collect(
        &self,
        scope: Option<ElementRef>,
        by: &By,
        first_only: bool,
    ) -> Result<Vec<Vec<usize>>, BrowserError> {
        let page = self.current()?;
        if let By::XPath(expr) = by {
            if scope.is_some() {
                return Err(BrowserError::Unsupported(by.clone()));
            }
            return Ok(page
                .xpaths
                .get(expr)
                .filter(|path| page.node(path).is_some())
                .cloned()
                .into_iter()
                .collect());
        }

        let base = match scope {
            Some(el) => self.handles.get(el.0).cloned().ok_or(BrowserError::Stale(el))?,
            None => Vec::new(),
        };
        let start = page.node(&base).ok_or_else(|| {
            BrowserError::Stale(scope.unwrap_or(ElementRef(usize::MAX)))
        })?;

        let mut found = Vec::new();
        walk(start, &base, by, first_only, &mut found)?;
        Ok(found)
    }

    fn register(&mut self, path: Vec<usize>) -> ElementRef {
        self.handles.push(path);
        ElementRef(self.handles.len() - 1)
    }
}

fn walk(
    node: &MockNode,
    path: &[usize],
    by: &By,
    first_only: bool,
    out: &mut Vec<Vec<usize>>,
) -> Result<(), BrowserError> {
    for (i, child) in node.children.iter().enumerate() {
        if first_only && !out.is_empty() {
            return Ok(());
        }
        let mut child_path = path.to_vec();
        child_path.push(i);
        if child.matches(by)? {
            out.push(child_path.clone());
        }
        walk(child, &child_path, by, first_only, out)?;
    }
    Ok(())
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.navigations.push(url.to_string());
        self.handles.clear();
        if self.failing_navigations.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        let page = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| MockPage::new(url));
        self.current = Some(page);
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.current()?.url.clone())
    }

    async fn find(
        &mut self,
        scope: Option<ElementRef>,
        by: &By,
    ) -> Result<ElementRef, BrowserError> {
        let path = self
            .collect(scope, by, true)?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::NotFound(by.clone()))?;
        Ok(self.register(path))
    }

    async fn find_all(
        &mut self,
        scope: Option<ElementRef>,
        by: &By,
    ) -> Result<Vec<ElementRef>, BrowserError> {
        let paths = self.collect(scope, by, false)?;
        Ok(paths.into_iter().map(|p| self.register(p)).collect())
    }

    async fn text(&mut self, el: ElementRef) -> Result<String, BrowserError> {
        let node = self.resolve(el)?;
        if node.fail_text {
            return Err(BrowserError::Protocol("text read detached".to_string()));
        }
        Ok(node.rendered_text())
    }

    async fn attribute(
        &mut self,
        el: ElementRef,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let node = self.resolve(el)?;
        if node.fail_attrs {
            return Err(BrowserError::Protocol("attribute read detached".to_string()));
        }
        Ok(node.attrs.get(name).cloned())
    }

    async fn is_clickable(&mut self, el: ElementRef) -> Result<bool, BrowserError> {
        Ok(!self.resolve(el)?.hidden)
    }

    async fn click(&mut self, el: ElementRef) -> Result<(), BrowserError> {
        let node = self.resolve(el)?;
        if node.hidden {
            return Err(BrowserError::Protocol("element not interactable".to_string()));
        }
        let label = node.label();
        self.clicks.push(label);
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.scripts.push(script.to_string());
        if self.current()?.failing_scripts {
            return Err(BrowserError::Script("ReferenceError: window is not defined".to_string()));
        }
        if script == "document.readyState" {
            return Ok(serde_json::Value::from("complete"));
        }
        Ok(serde_json::Value::Null)
    }

    async fn call_on(
        &mut self,
        el: ElementRef,
        function: &str,
    ) -> Result<serde_json::Value, BrowserError> {
        let label = self.resolve(el)?.label();
        self.scripts.push(function.to_string());
        if function.contains("this.click()") {
            self.clicks.push(label);
        }
        Ok(serde_json::Value::Null)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        Ok(())
    }
}
