use std::time::Duration;

use tracing::{debug, info, warn};

use testwright::{candidates, AutomationError, Page, SelectorResolver};

use crate::identity::Identity;
use crate::session::SessionStore;

/// Candidate selectors for the username field, most-specific-first.
pub const USERNAME_FIELDS: &[&str] = &[
    "input[name='user-name']",
    "#user-name",
    "input[type='email']",
    "#username",
    "#email",
];

/// Candidate selectors for the password field.
pub const PASSWORD_FIELDS: &[&str] = &["input[name='password']", "#password", "input[type='password']"];

/// Candidate selectors for the submit control.
pub const SUBMIT_CONTROLS: &[&str] = &[
    "input[type='submit']",
    "#login-button",
    "button[type='submit']",
    "[data-test='login-button']",
];

/// Markers whose presence on the login page means the user is logged out.
/// Also the probe set used by session validation.
pub const LOGIN_FORM_MARKERS: &[&str] = &["input[name='user-name']", "#user-name", "input[type='email']"];

/// Number of dismiss signals sent after login for transient interstitials
/// (password-save bubbles and the like). Absence is fine.
const DISMISS_SIGNALS: usize = 2;

/// Drives the login form directly, bypassing any AI capability.
///
/// This is the only routine in the pipeline that reads secret material and
/// the only one permitted to touch the live page with it. The secret is never
/// formatted into any string destined for the exploration agent or a log
/// sink. Runs only on cache miss / invalid session.
pub struct CredentialInjector<'a> {
    store: &'a SessionStore,
    settle: Duration,
}

impl<'a> CredentialInjector<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store, settle: Duration::from_secs(3) }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Navigate to the login page, fill and submit the form, dismiss
    /// post-login interstitials, then capture the cookie jar into the store.
    ///
    /// Non-standard forms degrade gracefully: a required field with no
    /// matching candidate is skipped rather than aborting the pipeline.
    pub async fn inject(&self, page: &Page, identity: &Identity) -> Result<(), AutomationError> {
        // Single writer per identity for the whole login + save window.
        let _slot = self.store.lock_identity(identity).await;

        info!(login_url = %identity.login_url, "injecting credentials locally");
        page.goto(&identity.login_url).await?;
        tokio::time::sleep(self.settle).await;

        let resolver = SelectorResolver::new(page);

        if let Err(e) = resolver
            .fill_first(&candidates(USERNAME_FIELDS), identity.username())
            .await
        {
            warn!(error = %e, "no username field matched, skipping");
        }
        if let Err(e) = resolver
            .fill_first(&candidates(PASSWORD_FIELDS), identity.password().expose())
            .await
        {
            warn!(error = %e, "no password field matched, skipping");
        }
        if let Err(e) = resolver.click_first(&candidates(SUBMIT_CONTROLS)).await {
            warn!(error = %e, "no submit control matched, skipping");
        }

        tokio::time::sleep(self.settle).await;
        self.dismiss_interstitials(page).await;

        match page.cookies().await {
            Ok(cookies) => self.store.save(identity, cookies),
            Err(e) => warn!(error = %e, "could not read cookie jar, session not cached"),
        }

        info!("credential injection complete, page handed back secret-free");
        Ok(())
    }

    async fn dismiss_interstitials(&self, page: &Page) {
        for _ in 0..DISMISS_SIGNALS {
            if let Err(e) = page.keyboard_signal("Escape").await {
                debug!(error = %e, "dismiss signal not delivered");
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}
