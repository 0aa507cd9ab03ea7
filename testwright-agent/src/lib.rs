//! AI-driven browser test generation and execution pipeline
//!
//! Turns a natural-language test goal into executable browser test scripts by
//! handing an authenticated page to an autonomous agent, recovering structured
//! test cases from its free-form output, and materializing one stand-alone
//! script per case. Execution prefers the deterministic script path and falls
//! back to a directed agent run only when no artifact exists.
//!
//! Credentials never cross into the agent: the only routine that reads them
//! drives the login form directly through the selector resolver.

pub mod agents;
pub mod backends;
pub mod config;
pub mod executor;
pub mod explorer;
pub mod extractor;
pub mod identity;
pub mod materializer;
pub mod pipeline;
pub mod secrets;
pub mod session;
pub mod suites;
pub mod types;

pub use agents::{AgentError, AutonomousAgent};
pub use config::PipelineConfig;
pub use executor::{ExecutionCoordinator, ExecutionPlan, Verdict};
pub use explorer::{ExplorationBrief, ExplorationOrchestrator, ExplorationPhase};
pub use extractor::extract_test_cases;
pub use identity::{Identity, SecretString};
pub use materializer::{ScriptArtifact, ScriptMaterializer, PASS_SENTINEL};
pub use pipeline::TestPipeline;
pub use secrets::CredentialInjector;
pub use session::{SessionArtifact, SessionStore};
pub use suites::{JsonSuiteRepository, Suite, SuiteConfig, SuiteRepository};
pub use types::{TestCase, TestStep};
