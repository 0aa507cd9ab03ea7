use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::types::TestCase;

/// The request that produced a suite; kept so later runs can regenerate or
/// re-execute it. Never holds credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub url: String,
    pub goal: String,
}

/// A named collection of generated test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    pub config: SuiteConfig,
    /// Cases keyed by id; later generations append or replace.
    pub cases: BTreeMap<String, TestCase>,
    /// Case id → path of the script generated for it.
    #[serde(default)]
    pub generated_scripts: BTreeMap<String, PathBuf>,
}

impl Suite {
    pub fn new(name: impl Into<String>, config: SuiteConfig) -> Self {
        Self {
            name: name.into(),
            config,
            cases: BTreeMap::new(),
            generated_scripts: BTreeMap::new(),
        }
    }

    /// Append or replace a case by id. Existing ids are overwritten; the case
    /// itself is immutable once stored.
    pub fn upsert_case(&mut self, case: TestCase) {
        self.cases.insert(case.id.clone(), case);
    }

    pub fn case(&self, id: &str) -> Option<&TestCase> {
        self.cases.get(id)
    }
}

/// Key-value persistence for suites, injected wherever suites are read or
/// written; pipeline logic never touches storage directly.
#[async_trait::async_trait]
pub trait SuiteRepository: Send + Sync {
    async fn get(&self, name: &str) -> Option<Suite>;
    async fn put(&self, suite: Suite);
}

/// File-backed repository: one JSON document mapping suite name → suite,
/// loaded at startup and rewritten after each put.
pub struct JsonSuiteRepository {
    path: PathBuf,
    suites: RwLock<HashMap<String, Suite>>,
}

impl JsonSuiteRepository {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let suites = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, Suite>>(&raw) {
                Ok(suites) => {
                    info!(count = suites.len(), path = %path.display(), "loaded suites");
                    suites
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "suite store unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, suites: RwLock::new(suites) }
    }

    fn persist(&self, suites: &HashMap<String, Suite>) {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let body = serde_json::to_string_pretty(suites)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            fs::write(&self.path, body)
        };
        if let Err(e) = write() {
            warn!(path = %self.path.display(), error = %e, "failed to persist suites");
        }
    }
}

#[async_trait::async_trait]
impl SuiteRepository for JsonSuiteRepository {
    async fn get(&self, name: &str) -> Option<Suite> {
        self.suites.read().await.get(name).cloned()
    }

    async fn put(&self, suite: Suite) {
        let mut suites = self.suites.write().await;
        suites.insert(suite.name.clone(), suite);
        self.persist(&suites);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestStep;
    use tempfile::TempDir;

    fn sample_suite() -> Suite {
        let mut suite = Suite::new(
            "smoke",
            SuiteConfig { url: "https://shop.example/".into(), goal: "checkout".into() },
        );
        suite.upsert_case(TestCase::new(
            "TC001",
            "checkout",
            vec![TestStep::new("Click 'Checkout'", Some("#checkout".into()))],
        ));
        suite
    }

    #[tokio::test]
    async fn put_then_get_roundtrip_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("suites.json");

        let repo = JsonSuiteRepository::open(&path);
        repo.put(sample_suite()).await;

        let reopened = JsonSuiteRepository::open(&path);
        let suite = reopened.get("smoke").await.expect("suite persisted");
        assert_eq!(suite.cases.len(), 1);
        assert_eq!(suite.case("TC001").unwrap().title, "checkout");
    }

    #[tokio::test]
    async fn unknown_suite_is_absent() {
        let dir = TempDir::new().unwrap();
        let repo = JsonSuiteRepository::open(dir.path().join("suites.json"));
        assert!(repo.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_store_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("suites.json");
        fs::write(&path, "{ not json").unwrap();

        let repo = JsonSuiteRepository::open(&path);
        assert!(repo.get("smoke").await.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let mut suite = sample_suite();
        suite.upsert_case(TestCase::new("TC001", "replaced", vec![TestStep::note("x")]));
        assert_eq!(suite.cases.len(), 1);
        assert_eq!(suite.case("TC001").unwrap().title, "replaced");
    }
}
