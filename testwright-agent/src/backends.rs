//! Fallback collaborators for deployments that haven't wired real ones yet.
//!
//! The browser-driving and autonomous-agent capabilities are
//! deployment-specific and injected by the embedding application. The CLI
//! falls back to these placeholders, which fail fast with a clear error while
//! still letting artifact-backed execution run: the deterministic script
//! path needs neither capability.

use testwright::{
    AutomationError, BrowserEngine, Cookie, ElementRef, Page, PageId, Selector,
};

use crate::agents::{AgentError, AutonomousAgent};

const NO_BROWSER: &str =
    "no browser backend configured; wire a BrowserEngine via the library API";

pub struct UnconfiguredBrowser;

#[async_trait::async_trait]
impl BrowserEngine for UnconfiguredBrowser {
    async fn new_page(&self) -> Result<PageId, AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn goto(&self, _page: PageId, _url: &str) -> Result<(), AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn get_elements(
        &self,
        _page: PageId,
        _selector: &Selector,
    ) -> Result<Vec<ElementRef>, AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn fill(
        &self,
        _page: PageId,
        _element: &ElementRef,
        _text: &str,
    ) -> Result<(), AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn click(&self, _page: PageId, _element: &ElementRef) -> Result<(), AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn cookies(&self, _page: PageId) -> Result<Vec<Cookie>, AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn add_cookies(&self, _page: PageId, _cookies: &[Cookie]) -> Result<(), AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn keyboard_signal(&self, _page: PageId, _key: &str) -> Result<(), AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
    async fn close_page(&self, _page: PageId) -> Result<(), AutomationError> {
        Err(AutomationError::BackendError(NO_BROWSER.into()))
    }
}

pub struct UnconfiguredAgent;

#[async_trait::async_trait]
impl AutonomousAgent for UnconfiguredAgent {
    async fn run(&self, _task: &str, _page: &Page) -> Result<String, AgentError> {
        Err(AgentError(
            "no agent backend configured; wire an AutonomousAgent via the library API".into(),
        ))
    }
}
