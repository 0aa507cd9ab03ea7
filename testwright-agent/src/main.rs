use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use testwright_agent::backends::{UnconfiguredAgent, UnconfiguredBrowser};
use testwright_agent::{
    config, JsonSuiteRepository, PipelineConfig, SessionStore, TestPipeline,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Testwright agent - AI-driven browser test generation and execution"
)]
struct Args {
    #[command(subcommand)]
    command: CliCommand,

    /// Directory holding per-identity session cache files
    #[arg(long, env = "TESTWRIGHT_CACHE_DIR", default_value = "data/auth_cache")]
    cache_dir: PathBuf,

    /// Directory generated scripts are written to
    #[arg(long, env = "TESTWRIGHT_ARTIFACTS_DIR", default_value = "data/generated_tests")]
    artifacts_dir: PathBuf,

    /// Suite store document
    #[arg(long, env = "TESTWRIGHT_SUITES_PATH", default_value = "data/test_suites.json")]
    suites_path: PathBuf,

    /// Program that runs generated scripts
    #[arg(long, env = "TESTWRIGHT_INTERPRETER", default_value = "node")]
    interpreter: String,

    /// Bound on one agent invocation, in seconds
    #[arg(long, env = "TESTWRIGHT_AGENT_TIMEOUT_SECS", default_value = "180")]
    agent_timeout_secs: u64,

    /// Bound on one generated-script run, in seconds
    #[arg(long, env = "TESTWRIGHT_SCRIPT_TIMEOUT_SECS", default_value = "60")]
    script_timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Explore the application and generate a test suite
    Generate {
        #[arg(long)]
        suite: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        goal: String,
    },
    /// Run one generated test case
    Execute {
        #[arg(long)]
        suite: String,
        #[arg(long)]
        case: String,
    },
    /// Remove the cached session for the configured identity
    ClearSession,
}

fn init_logging() {
    let log_level = std::env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials live in .env / the environment, never on the command line.
    dotenvy::dotenv().ok();
    init_logging();

    let args = Args::parse();
    let pipeline_config = PipelineConfig {
        cache_dir: args.cache_dir.clone(),
        artifacts_dir: args.artifacts_dir.clone(),
        suites_path: args.suites_path.clone(),
        agent_timeout: Duration::from_secs(args.agent_timeout_secs),
        script_timeout: Duration::from_secs(args.script_timeout_secs),
        interpreter: args.interpreter.clone(),
        ..PipelineConfig::default()
    };

    let identity = config::identity_from_env()?;

    match args.command {
        CliCommand::Generate { suite, url, goal } => {
            let pipeline = build_pipeline(&pipeline_config);
            let result = pipeline.generate(&suite, &url, &goal, &identity).await;
            println!("{}", serde_json::to_string_pretty(&result.cases.values().collect::<Vec<_>>())?);
        }
        CliCommand::Execute { suite, case } => {
            let pipeline = build_pipeline(&pipeline_config);
            let verdict = pipeline.execute(&suite, &case, &identity).await;
            println!("{verdict}");
        }
        CliCommand::ClearSession => {
            SessionStore::new(&pipeline_config.cache_dir).clear(&identity);
            println!("session cache cleared");
        }
    }

    Ok(())
}

fn build_pipeline(pipeline_config: &PipelineConfig) -> TestPipeline {
    let repo = Arc::new(JsonSuiteRepository::open(&pipeline_config.suites_path));
    TestPipeline::new(
        Arc::new(UnconfiguredBrowser),
        Arc::new(UnconfiguredAgent),
        repo,
        pipeline_config,
    )
}
