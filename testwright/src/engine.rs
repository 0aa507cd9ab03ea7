use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AutomationError;
use crate::selector::Selector;

/// Opaque handle to a browser page owned by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// A single cookie record as captured from / restored into a browser context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix timestamp; `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

/// A reference to one concrete element matched on a live page.
///
/// The reference only stays meaningful while the page that produced it is on
/// the same document; engines may invalidate it after navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Engine-assigned element identifier.
    pub id: String,
    /// The selector expression that matched this element.
    pub matched_by: String,
    /// Whether the element is currently visible and enabled.
    pub interactable: bool,
}

/// The common trait a browser automation backend must implement.
///
/// This is the external collaborator boundary: the pipeline never talks to a
/// concrete browser, only to this contract.
#[async_trait::async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a fresh page in its own context.
    async fn new_page(&self) -> Result<PageId, AutomationError>;

    /// Navigate the page and wait for the load to settle.
    async fn goto(&self, page: PageId, url: &str) -> Result<(), AutomationError>;

    /// All elements currently matching the selector, in document order.
    async fn get_elements(
        &self,
        page: PageId,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, AutomationError>;

    /// Replace the value of exactly one element.
    async fn fill(
        &self,
        page: PageId,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), AutomationError>;

    /// Click exactly one element.
    async fn click(&self, page: PageId, element: &ElementRef) -> Result<(), AutomationError>;

    /// Snapshot of the page context's cookie jar.
    async fn cookies(&self, page: PageId) -> Result<Vec<Cookie>, AutomationError>;

    /// Add cookies to the page context before navigation.
    async fn add_cookies(&self, page: PageId, cookies: &[Cookie]) -> Result<(), AutomationError>;

    /// Send a bare keyboard signal (e.g. "Escape") to the page.
    async fn keyboard_signal(&self, page: PageId, key: &str) -> Result<(), AutomationError>;

    /// Tear the page down and release its context.
    async fn close_page(&self, page: PageId) -> Result<(), AutomationError>;
}

/// A live page handle carrying its engine.
///
/// Cheap to clone; the underlying page is closed explicitly via [`Page::close`].
/// Callers own teardown: every exit path of a pipeline stage must close the
/// pages it opened.
#[derive(Clone)]
pub struct Page {
    engine: Arc<dyn BrowserEngine>,
    id: PageId,
}

impl Page {
    /// Open a fresh page on the given engine.
    pub async fn open(engine: Arc<dyn BrowserEngine>) -> Result<Self, AutomationError> {
        let id = engine.new_page().await?;
        debug!(%id, "opened page");
        Ok(Self { engine, id })
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn engine(&self) -> Arc<dyn BrowserEngine> {
        self.engine.clone()
    }

    pub async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.engine.goto(self.id, url).await
    }

    pub async fn get_elements(
        &self,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, AutomationError> {
        if let Selector::Invalid(reason) = selector {
            return Err(AutomationError::InvalidSelector(reason.clone()));
        }
        self.engine.get_elements(self.id, selector).await
    }

    pub async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError> {
        self.engine.fill(self.id, element, text).await
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.engine.click(self.id, element).await
    }

    pub async fn cookies(&self) -> Result<Vec<Cookie>, AutomationError> {
        self.engine.cookies(self.id).await
    }

    pub async fn add_cookies(&self, cookies: &[Cookie]) -> Result<(), AutomationError> {
        self.engine.add_cookies(self.id, cookies).await
    }

    pub async fn keyboard_signal(&self, key: &str) -> Result<(), AutomationError> {
        self.engine.keyboard_signal(self.id, key).await
    }

    pub async fn close(&self) -> Result<(), AutomationError> {
        debug!(id = %self.id, "closing page");
        self.engine.close_page(self.id).await
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("id", &self.id).finish()
    }
}
