use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use testwright::{BrowserEngine, Page};

use crate::agents::AutonomousAgent;
use crate::explorer::ensure_authenticated;
use crate::identity::Identity;
use crate::materializer::{ScriptMaterializer, PASS_SENTINEL};
use crate::session::SessionStore;
use crate::suites::Suite;
use crate::types::TestCase;

/// Terminal outcome of one test execution. Never an unhandled exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Timeout,
    Error,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Timeout => "TIMEOUT",
            Verdict::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// How a case will be executed, selected by a single artifact lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPlan {
    /// A current generated script exists: run it as an isolated process.
    Script(PathBuf),
    /// No artifact: re-authenticate and direct the agent through the steps.
    Agent,
}

/// Runs one generated test case, preferring the deterministic script path.
///
/// The script path is fast, reproducible and costs no LLM tokens; the
/// agent-mediated path is slower and variance-prone, so it runs only when no
/// artifact exists. The child process owns a fully independent browser
/// session; nothing is shared with the generation-time browser.
pub struct ExecutionCoordinator {
    engine: Arc<dyn BrowserEngine>,
    agent: Arc<dyn AutonomousAgent>,
    store: Arc<SessionStore>,
    materializer: ScriptMaterializer,
    interpreter: String,
    script_timeout: Duration,
    agent_timeout: Duration,
    settle: Duration,
}

impl ExecutionCoordinator {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        agent: Arc<dyn AutonomousAgent>,
        store: Arc<SessionStore>,
        materializer: ScriptMaterializer,
    ) -> Self {
        Self {
            engine,
            agent,
            store,
            materializer,
            interpreter: "node".to_string(),
            script_timeout: Duration::from_secs(60),
            agent_timeout: Duration::from_secs(180),
            settle: Duration::from_secs(2),
        }
    }

    /// Program used to run generated scripts (`node` by default).
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// The plan for a case: script when a current artifact exists, agent
    /// fallback otherwise.
    pub fn plan(&self, suite_name: &str, case_id: &str) -> ExecutionPlan {
        match self.materializer.current_artifact(suite_name, case_id) {
            Some(path) => ExecutionPlan::Script(path),
            None => ExecutionPlan::Agent,
        }
    }

    /// Execute one case of a suite and return its verdict.
    pub async fn execute(&self, suite: &Suite, case_id: &str, identity: &Identity) -> Verdict {
        let Some(case) = suite.case(case_id) else {
            warn!(suite = %suite.name, case_id, "test case not found");
            return Verdict::Error;
        };

        match self.plan(&suite.name, case_id) {
            ExecutionPlan::Script(path) => {
                info!(path = %path.display(), "executing generated script");
                self.run_script(path).await
            }
            ExecutionPlan::Agent => {
                info!(case_id, "no script artifact, falling back to agent execution");
                self.run_via_agent(case, identity).await
            }
        }
    }

    async fn run_script(&self, path: PathBuf) -> Verdict {
        let child = Command::new(&self.interpreter)
            .arg(&path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, interpreter = %self.interpreter, "failed to spawn script");
                return Verdict::Error;
            }
        };

        // Dropping the in-flight wait on timeout kills the child via
        // kill_on_drop, so an expired run cannot leak a browser process.
        match tokio::time::timeout(self.script_timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(path = %path.display(), "script exceeded {:?}", self.script_timeout);
                Verdict::Timeout
            }
            Ok(Err(e)) => {
                warn!(error = %e, "script execution failed");
                Verdict::Error
            }
            Ok(Ok(output)) => {
                let combined = format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
                if combined.contains(PASS_SENTINEL) || output.status.success() {
                    Verdict::Pass
                } else {
                    info!(tail = %tail(&combined), "script reported failure");
                    Verdict::Fail
                }
            }
        }
    }

    async fn run_via_agent(&self, case: &TestCase, identity: &Identity) -> Verdict {
        let page = match Page::open(self.engine.clone()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "browser unavailable for agent execution");
                return Verdict::Error;
            }
        };

        ensure_authenticated(&self.store, &page, identity, self.settle).await;

        let task = execution_task(case);
        let verdict = match tokio::time::timeout(self.agent_timeout, self.agent.run(&task, &page))
            .await
        {
            Ok(Ok(reply)) => {
                // Anything other than the PASS sentinel is a failure.
                if reply.trim().eq_ignore_ascii_case("PASS") {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "agent execution failed");
                Verdict::Error
            }
            Err(_) => {
                warn!("agent execution exceeded {:?}", self.agent_timeout);
                Verdict::Timeout
            }
        };

        if let Err(e) = page.close().await {
            warn!(error = %e, "page teardown failed");
        }
        verdict
    }
}

/// Directed task whose body is exactly the stored step list.
fn execution_task(case: &TestCase) -> String {
    let steps = case
        .steps
        .iter()
        .map(|step| match &step.selector {
            Some(selector) => format!("{} using selector: {selector}", step.action_text),
            None => step.action_text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a Test Executor.\n\
         Execute these steps exactly:\n\
         {steps}\n\
         \n\
         If the flow completes successfully, return exactly the string \"PASS\".\n\
         If it fails, return exactly the string \"FAIL\"."
    )
}

fn tail(s: &str) -> &str {
    // Stay on a char boundary for the log excerpt.
    let mut start = s.len().saturating_sub(200);
    while start > 0 && !s.is_char_boundary(start) {
        start -= 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestStep;

    #[test]
    fn execution_task_lists_steps_in_order() {
        let case = TestCase::new(
            "TC001",
            "checkout",
            vec![
                TestStep::new("Click 'Add to cart'", Some("#add".into())),
                TestStep::new("Open the cart", None),
            ],
        );
        let task = execution_task(&case);
        let add = task.find("Click 'Add to cart' using selector: #add").unwrap();
        let open = task.find("Open the cart").unwrap();
        assert!(add < open, "steps must keep their recorded order");
        assert!(task.contains("\"PASS\""));
    }

    #[test]
    fn verdict_displays_upper_case() {
        assert_eq!(Verdict::Pass.to_string(), "PASS");
        assert_eq!(Verdict::Timeout.to_string(), "TIMEOUT");
    }
}
