use std::sync::Arc;

use tracing::{info, warn};

use testwright::BrowserEngine;

use crate::agents::AutonomousAgent;
use crate::config::PipelineConfig;
use crate::executor::{ExecutionCoordinator, Verdict};
use crate::explorer::ExplorationOrchestrator;
use crate::extractor::extract_test_cases;
use crate::identity::Identity;
use crate::materializer::ScriptMaterializer;
use crate::session::SessionStore;
use crate::suites::{Suite, SuiteConfig, SuiteRepository};

/// Wires the pipeline stages together:
/// goal + identity → login/session → exploration → extraction →
/// materialization → (later) execution → verdict.
pub struct TestPipeline {
    orchestrator: ExplorationOrchestrator,
    coordinator: ExecutionCoordinator,
    materializer: ScriptMaterializer,
    repo: Arc<dyn SuiteRepository>,
}

impl TestPipeline {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        agent: Arc<dyn AutonomousAgent>,
        repo: Arc<dyn SuiteRepository>,
        config: &PipelineConfig,
    ) -> Self {
        let store = Arc::new(SessionStore::new(&config.cache_dir).with_settle(config.settle));

        let orchestrator = ExplorationOrchestrator::new(
            engine.clone(),
            agent.clone(),
            store.clone(),
            config.agent_timeout,
        )
        .with_settle(config.settle);

        let coordinator = ExecutionCoordinator::new(
            engine,
            agent,
            store,
            ScriptMaterializer::new(&config.artifacts_dir),
        )
        .with_interpreter(&config.interpreter)
        .with_script_timeout(config.script_timeout)
        .with_agent_timeout(config.agent_timeout)
        .with_settle(config.settle);

        Self {
            orchestrator,
            coordinator,
            materializer: ScriptMaterializer::new(&config.artifacts_dir),
            repo,
        }
    }

    /// Run one generation request. Always returns a suite: a failed run
    /// carries a single diagnostic test case instead of an error.
    pub async fn generate(
        &self,
        suite_name: &str,
        url: &str,
        goal: &str,
        identity: &Identity,
    ) -> Suite {
        info!(suite = suite_name, url, "generation request");

        let raw = self.orchestrator.explore(identity, goal).await;
        let cases = extract_test_cases(&raw);

        let mut suite = self
            .repo
            .get(suite_name)
            .await
            .unwrap_or_else(|| Suite::new(suite_name, SuiteConfig::default()));
        suite.config = SuiteConfig { url: url.to_string(), goal: goal.to_string() };

        let mut artifacts = Vec::new();
        for case in &cases {
            suite.upsert_case(case.clone());
            match self.materializer.materialize(suite_name, case, identity) {
                Ok(artifact) => {
                    suite.generated_scripts.insert(case.id.clone(), artifact.path.clone());
                    artifacts.push(artifact);
                }
                Err(e) => warn!(case = %case.id, error = %e, "script materialization failed"),
            }
        }

        if !artifacts.is_empty() {
            if let Err(e) =
                self.materializer.write_suite_metadata(suite_name, &cases, &artifacts, identity)
            {
                warn!(error = %e, "suite metadata not written");
            }
        }

        self.repo.put(suite.clone()).await;
        info!(suite = suite_name, cases = cases.len(), scripts = artifacts.len(), "generation done");
        suite
    }

    /// Run one stored test case and return its verdict.
    pub async fn execute(&self, suite_name: &str, case_id: &str, identity: &Identity) -> Verdict {
        let Some(suite) = self.repo.get(suite_name).await else {
            warn!(suite = suite_name, "suite not found");
            return Verdict::Error;
        };
        self.coordinator.execute(&suite, case_id, identity).await
    }
}
