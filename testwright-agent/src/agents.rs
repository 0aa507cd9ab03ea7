use thiserror::Error;

use testwright::Page;

#[derive(Error, Debug)]
#[error("agent failed: {0}")]
pub struct AgentError(pub String);

/// Black-box autonomous browser-driving capability.
///
/// Given a task description and an already-authenticated page, the agent
/// explores or executes on its own and eventually returns its terminal text
/// output. Latency is seconds to minutes; the call may fail. Callers bound it
/// with a timeout and never hand it secret material.
#[async_trait::async_trait]
pub trait AutonomousAgent: Send + Sync {
    async fn run(&self, task: &str, page: &Page) -> Result<String, AgentError>;
}
