use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use testwright::{candidates, Cookie, Page, SelectorResolver};

use crate::identity::Identity;
use crate::secrets::LOGIN_FORM_MARKERS;

/// Cached browser cookies representing an authenticated session.
///
/// Never holds secret material, only what the browser itself would persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionArtifact {
    pub identity_hash: String,
    pub cookies: Vec<Cookie>,
    pub captured_at: DateTime<Utc>,
}

/// Persists and validates per-identity authentication artifacts.
///
/// Files are keyed by the identity's one-way hash and carry owner-only
/// permissions. The store self-heals: malformed files and artifacts that fail
/// validation are deleted and treated as cache misses.
pub struct SessionStore {
    cache_dir: PathBuf,
    settle: Duration,
    slots: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            settle: Duration::from_secs(2),
            slots: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Override the post-navigation settle delay (tests use a short one).
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn cache_path(&self, identity: &Identity) -> PathBuf {
        self.cache_dir.join(format!("{}_session.json", identity.identity_hash()))
    }

    /// Per-identity write slot. Held for the duration of login + save so the
    /// cache file has a single writer per identity; readers are unaffected.
    pub async fn lock_identity(&self, identity: &Identity) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            slots
                .entry(identity.identity_hash())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Read the cached artifact, if any. A malformed file is deleted as a
    /// side effect and reported as absent.
    pub fn load(&self, identity: &Identity) -> Option<SessionArtifact> {
        let path = self.cache_path(identity);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return None,
        };
        match serde_json::from_str::<SessionArtifact>(&raw) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt session cache, removing");
                remove_quietly(&path);
                None
            }
        }
    }

    /// Persist cookies for the identity. Write failure is logged and never
    /// fails the pipeline.
    pub fn save(&self, identity: &Identity, cookies: Vec<Cookie>) {
        let artifact = SessionArtifact {
            identity_hash: identity.identity_hash(),
            cookies,
            captured_at: Utc::now(),
        };
        let path = self.cache_path(identity);
        if let Err(e) = self.write_artifact(&path, &artifact) {
            warn!(path = %path.display(), error = %e, "failed to save session cache");
        } else {
            info!(path = %path.display(), "session cookies cached");
        }
    }

    fn write_artifact(&self, path: &Path, artifact: &SessionArtifact) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let body = serde_json::to_string(artifact)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Inject cached cookies and probe whether the session is still live.
    ///
    /// The login page is loaded with the cookies installed; if no login-form
    /// marker is present the session is considered valid. A marker, or any
    /// error along the way, invalidates the artifact and deletes it; the
    /// store never assumes a session is authenticated.
    pub async fn validate(&self, page: &Page, identity: &Identity) -> bool {
        let Some(artifact) = self.load(identity) else {
            debug!("no cached session for identity");
            return false;
        };

        match self.probe(page, identity, &artifact).await {
            Ok(true) => {
                info!("cached session valid, skipping login");
                true
            }
            Ok(false) => {
                info!("cached session expired, removing cache");
                self.clear(identity);
                false
            }
            Err(e) => {
                warn!(error = %e, "session validation failed, removing cache");
                self.clear(identity);
                false
            }
        }
    }

    async fn probe(
        &self,
        page: &Page,
        identity: &Identity,
        artifact: &SessionArtifact,
    ) -> Result<bool, testwright::AutomationError> {
        page.add_cookies(&artifact.cookies).await?;
        page.goto(&identity.login_url).await?;
        tokio::time::sleep(self.settle).await;

        let resolver = SelectorResolver::new(page);
        let login_form_present = resolver.any_match(&candidates(LOGIN_FORM_MARKERS)).await?;
        Ok(!login_form_present)
    }

    /// Remove the cached session (explicit logout, failed validation).
    pub fn clear(&self, identity: &Identity) {
        remove_quietly(&self.cache_path(identity));
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove session cache");
        }
    }
}
