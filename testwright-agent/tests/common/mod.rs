//! In-memory collaborators for pipeline tests: a browser engine that models
//! one login-gated application, and an agent with scripted replies.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use testwright::{AutomationError, BrowserEngine, Cookie, ElementRef, Page, PageId, Selector};
use testwright_agent::secrets::{
    LOGIN_FORM_MARKERS, PASSWORD_FIELDS, SUBMIT_CONTROLS, USERNAME_FIELDS,
};
use testwright_agent::{AgentError, AutonomousAgent};

const SESSION_COOKIE: &str = "session";

#[derive(Default)]
struct PageState {
    authenticated: bool,
    jar: Vec<Cookie>,
}

#[derive(Default)]
struct BrowserState {
    next_page: u64,
    pages: HashMap<PageId, PageState>,
}

/// Models an application whose login form is present exactly while the page's
/// context is unauthenticated. Submitting the form, or restoring a live
/// session cookie, authenticates that context. Every page is its own context,
/// as a real engine would have it.
pub struct MockBrowser {
    state: Mutex<BrowserState>,
    /// Whether a restored session cookie still counts as live server-side.
    accept_restored_cookies: bool,
    pub fills: Mutex<Vec<(String, String)>>,
    pub clicks: Mutex<Vec<String>>,
    pub gotos: Mutex<Vec<String>>,
    pub closed_pages: Mutex<Vec<PageId>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrowserState::default()),
            accept_restored_cookies: true,
            fills: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            gotos: Mutex::new(Vec::new()),
            closed_pages: Mutex::new(Vec::new()),
        }
    }

    /// An application that expired every cached session server-side.
    pub fn rejecting_restored_cookies() -> Self {
        Self { accept_restored_cookies: false, ..Self::new() }
    }

    pub fn fill_count(&self) -> usize {
        self.fills.lock().unwrap().len()
    }

    pub fn open_page_count(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    fn is_login_selector(expr: &str) -> bool {
        USERNAME_FIELDS
            .iter()
            .chain(PASSWORD_FIELDS)
            .chain(SUBMIT_CONTROLS)
            .chain(LOGIN_FORM_MARKERS)
            .any(|s| *s == expr)
    }

    fn live_session_cookie() -> Cookie {
        Cookie {
            name: SESSION_COOKIE.to_string(),
            value: "live".to_string(),
            domain: "shop.example".to_string(),
            path: "/".to_string(),
            expiry: None,
        }
    }
}

#[async_trait::async_trait]
impl BrowserEngine for MockBrowser {
    async fn new_page(&self) -> Result<PageId, AutomationError> {
        let mut state = self.state.lock().unwrap();
        state.next_page += 1;
        let id = PageId(state.next_page);
        state.pages.insert(id, PageState::default());
        Ok(id)
    }

    async fn goto(&self, _page: PageId, url: &str) -> Result<(), AutomationError> {
        self.gotos.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn get_elements(
        &self,
        page: PageId,
        selector: &Selector,
    ) -> Result<Vec<ElementRef>, AutomationError> {
        let expr = selector.expression();
        let state = self.state.lock().unwrap();
        let page_state = state
            .pages
            .get(&page)
            .ok_or_else(|| AutomationError::PageClosed(page.to_string()))?;
        if !page_state.authenticated && Self::is_login_selector(expr) {
            return Ok(vec![ElementRef {
                id: format!("el:{expr}"),
                matched_by: expr.to_string(),
                interactable: true,
            }]);
        }
        Ok(Vec::new())
    }

    async fn fill(
        &self,
        _page: PageId,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), AutomationError> {
        self.fills.lock().unwrap().push((element.matched_by.clone(), text.to_string()));
        Ok(())
    }

    async fn click(&self, page: PageId, element: &ElementRef) -> Result<(), AutomationError> {
        self.clicks.lock().unwrap().push(element.matched_by.clone());
        if SUBMIT_CONTROLS.contains(&element.matched_by.as_str()) {
            let mut state = self.state.lock().unwrap();
            if let Some(page_state) = state.pages.get_mut(&page) {
                page_state.authenticated = true;
                page_state.jar = vec![Self::live_session_cookie()];
            }
        }
        Ok(())
    }

    async fn cookies(&self, page: PageId) -> Result<Vec<Cookie>, AutomationError> {
        let state = self.state.lock().unwrap();
        Ok(state.pages.get(&page).map(|p| p.jar.clone()).unwrap_or_default())
    }

    async fn add_cookies(&self, page: PageId, cookies: &[Cookie]) -> Result<(), AutomationError> {
        let restored_live = cookies.iter().any(|c| c.name == SESSION_COOKIE && c.value == "live");
        if restored_live && self.accept_restored_cookies {
            let mut state = self.state.lock().unwrap();
            if let Some(page_state) = state.pages.get_mut(&page) {
                page_state.authenticated = true;
                page_state.jar = cookies.to_vec();
            }
        }
        Ok(())
    }

    async fn keyboard_signal(&self, _page: PageId, _key: &str) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn close_page(&self, page: PageId) -> Result<(), AutomationError> {
        self.state.lock().unwrap().pages.remove(&page);
        self.closed_pages.lock().unwrap().push(page);
        Ok(())
    }
}

/// Agent returning a scripted reply, recording every task it was handed.
pub struct ScriptedAgent {
    reply: Result<String, String>,
    pub calls: AtomicUsize,
    pub tasks: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn replying(output: &str) -> Self {
        Self {
            reply: Ok(output.to_string()),
            calls: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AutonomousAgent for ScriptedAgent {
    async fn run(&self, task: &str, _page: &Page) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().unwrap().push(task.to_string());
        self.reply.clone().map_err(AgentError)
    }
}
