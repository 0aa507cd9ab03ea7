use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn, Instrument};

use testwright::{BrowserEngine, Page};

use crate::agents::AutonomousAgent;
use crate::identity::Identity;
use crate::secrets::CredentialInjector;
use crate::session::SessionStore;

/// Request lifecycle, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationPhase {
    Init,
    SessionCheck,
    CachedValid,
    FreshLogin,
    Exploring,
    Done,
    Failed,
}

/// Secret-free description of what the agent should do.
///
/// Deliberately a distinct type from [`Identity`]: the task string is built
/// from this object only, so credentials are excluded by construction rather
/// than by filtering.
#[derive(Debug, Clone)]
pub struct ExplorationBrief {
    pub goal: String,
}

impl ExplorationBrief {
    pub fn new(goal: impl Into<String>) -> Self {
        Self { goal: goal.into() }
    }

    /// The full task text handed to the agent: the goal, an assertion that
    /// login is already complete, and the output contract.
    pub fn task_text(&self) -> String {
        format!(
            "GOAL: {}\n\
             \n\
             INSTRUCTIONS:\n\
             1. You are ALREADY logged in; never ask for or enter credentials.\n\
             2. PERFORM the goal by actually clicking buttons and filling forms.\n\
             3. Document each action you performed with the selector you used.\n\
             \n\
             CRITICAL - OUTPUT FORMAT:\n\
             Return ONLY this JSON structure with NO other text:\n\
             {{\"test_cases\": [{{\"id\": \"TC001\", \"title\": \"...\", \
             \"steps\": [\"Click '...' using selector: ...\"]}}]}}\n\
             \n\
             RULES:\n\
             - NO explanations\n\
             - NO markdown\n\
             - ONLY the raw JSON object starting with {{\n\
             - Each step MUST include the selector you used",
            self.goal
        )
    }
}

/// Hands an authenticated page to the autonomous agent and returns its raw
/// terminal output.
///
/// One request drives one page sequentially; the agent interaction is a
/// single long-running bounded call. Page teardown happens on every exit
/// path, and failures surface as an error-shaped payload the extractor turns
/// into a diagnostic test case; nothing propagates.
pub struct ExplorationOrchestrator {
    engine: Arc<dyn BrowserEngine>,
    agent: Arc<dyn AutonomousAgent>,
    store: Arc<SessionStore>,
    agent_timeout: Duration,
    settle: Duration,
}

impl ExplorationOrchestrator {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        agent: Arc<dyn AutonomousAgent>,
        store: Arc<SessionStore>,
        agent_timeout: Duration,
    ) -> Self {
        Self { engine, agent, store, agent_timeout, settle: Duration::from_secs(3) }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Run one exploration request end to end and return the agent's raw
    /// text (or an error payload shaped like agent output).
    pub async fn explore(&self, identity: &Identity, goal: &str) -> String {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("explore", %request_id);

        async {
            debug!(phase = ?ExplorationPhase::Init, "opening page");
            let page = match Page::open(self.engine.clone()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(phase = ?ExplorationPhase::Failed, error = %e, "browser unavailable");
                    return error_payload("Browser Startup Failed", &e.to_string());
                }
            };

            let output = self.run_on_page(&page, identity, goal).await;

            if let Err(e) = page.close().await {
                warn!(error = %e, "page teardown failed");
            }
            output
        }
        .instrument(span)
        .await
    }

    async fn run_on_page(&self, page: &Page, identity: &Identity, goal: &str) -> String {
        debug!(phase = ?ExplorationPhase::SessionCheck, "validating cached session");
        if self.store.validate(page, identity).await {
            debug!(phase = ?ExplorationPhase::CachedValid, "reusing cached session");
        } else {
            debug!(phase = ?ExplorationPhase::FreshLogin, "performing fresh login");
            let injector = CredentialInjector::new(&self.store).with_settle(self.settle);
            if let Err(e) = injector.inject(page, identity).await {
                // Best-effort: a non-standard login page should not kill the
                // whole request; the agent may still be able to proceed.
                warn!(error = %e, "credential injection degraded");
            }
        }

        debug!(phase = ?ExplorationPhase::Exploring, "handing page to agent");
        let brief = ExplorationBrief::new(goal);
        let task_text = brief.task_text();
        let run = self.agent.run(&task_text, page);

        match tokio::time::timeout(self.agent_timeout, run).await {
            Ok(Ok(output)) if !output.trim().is_empty() => {
                info!(phase = ?ExplorationPhase::Done, bytes = output.len(), "agent finished");
                output
            }
            Ok(Ok(_)) => {
                warn!(phase = ?ExplorationPhase::Failed, "agent returned no output");
                error_payload(
                    "Agent Execution Failed",
                    "Agent stopped without producing a result. This is often an \
                     API rate limit; wait a minute and try again.",
                )
            }
            Ok(Err(e)) => {
                warn!(phase = ?ExplorationPhase::Failed, error = %e, "agent run failed");
                error_payload("Agent Execution Failed", &e.to_string())
            }
            Err(_) => {
                warn!(phase = ?ExplorationPhase::Failed, "agent run timed out");
                error_payload(
                    "Agent Execution Failed",
                    &format!("Agent did not finish within {:?}.", self.agent_timeout),
                )
            }
        }
    }
}

/// Shared by the executor's fallback path: make sure the page is logged in,
/// via cached session when valid, fresh injection otherwise.
pub(crate) async fn ensure_authenticated(
    store: &SessionStore,
    page: &Page,
    identity: &Identity,
    settle: Duration,
) {
    if store.validate(page, identity).await {
        return;
    }
    let injector = CredentialInjector::new(store).with_settle(settle);
    if let Err(e) = injector.inject(page, identity).await {
        warn!(error = %e, "credential injection degraded");
    }
}

/// Error output shaped exactly like agent output, so the extractor recovers a
/// diagnostic test case from it with no special-casing.
fn error_payload(title: &str, detail: &str) -> String {
    json!({
        "test_cases": [{
            "id": "ERR",
            "title": title,
            "steps": [detail],
        }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SecretString;

    #[test]
    fn task_text_contains_goal_and_contract_only() {
        let identity =
            Identity::new("alice", SecretString::new("hunter2"), "https://shop.example/login");
        let brief = ExplorationBrief::new("Add an item to the cart and check out");
        let task = brief.task_text();

        assert!(task.contains("Add an item to the cart"));
        assert!(task.contains("test_cases"));
        // Secrets are excluded by construction; the brief never saw them.
        assert!(!task.contains("hunter2"));
        assert!(!task.contains(identity.username()));
    }

    #[test]
    fn error_payload_is_extractable() {
        let payload = error_payload("Agent Execution Failed", "boom");
        let cases = crate::extractor::extract_test_cases(&payload);
        assert_eq!(cases.len(), 1);
        assert!(cases[0].is_error());
        assert_eq!(cases[0].steps[0].action_text, "boom");
    }
}
