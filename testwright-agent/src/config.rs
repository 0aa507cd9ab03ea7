use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::identity::{Identity, SecretString};

/// Everything the pipeline needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding per-identity session cache files.
    pub cache_dir: PathBuf,
    /// Directory generated scripts and suite metadata are written to.
    pub artifacts_dir: PathBuf,
    /// The suite store document.
    pub suites_path: PathBuf,
    /// Bound on one agent invocation (exploration or directed execution).
    pub agent_timeout: Duration,
    /// Bound on one generated-script subprocess run.
    pub script_timeout: Duration,
    /// Program that runs generated scripts.
    pub interpreter: String,
    /// Post-navigation settle delay.
    pub settle: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/auth_cache"),
            artifacts_dir: PathBuf::from("data/generated_tests"),
            suites_path: PathBuf::from("data/test_suites.json"),
            agent_timeout: Duration::from_secs(180),
            script_timeout: Duration::from_secs(60),
            interpreter: "node".to_string(),
            settle: Duration::from_secs(2),
        }
    }
}

/// Build the run's identity from the environment.
///
/// Credentials come only from the environment (loaded from `.env` by the
/// binary), never from argv; they must not show up in process listings or
/// shell history.
pub fn identity_from_env() -> anyhow::Result<Identity> {
    let username = env::var("APP_USERNAME").context("APP_USERNAME is not set")?;
    let password = env::var("APP_PASSWORD").context("APP_PASSWORD is not set")?;
    let login_url = env::var("APP_LOGIN_URL").context("APP_LOGIN_URL is not set")?;
    Ok(Identity::new(username, SecretString::new(password), login_url))
}
