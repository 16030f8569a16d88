use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use debt_agents::adapters::{HttpLlm, LocalRepo, MemoryStore};
use debt_agents::config::PipelineSettings;
use debt_agents::pipeline::{ScanError, ScanPipeline, ScanRequest};
use debt_agents::roster::Roster;
use debt_agents::telemetry;

#[derive(Parser)]
#[command(name = "debt-agents", about = "Multi-agent technical-debt analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a local repository and emit a remediation plan.
    Scan {
        /// Path to the repository checkout.
        repo: PathBuf,
        /// TOML settings file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the full scan outcome (JSON) here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Repository identifier used for temporal tracking.
        #[arg(long)]
        repo_id: Option<String>,
        /// Run the Historian alongside discovery.
        #[arg(long)]
        historian: bool,
        /// Route stalled debates and conflicts through the LLM arbiter.
        #[arg(long)]
        arbiter: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            repo,
            config,
            output,
            repo_id,
            historian,
            arbiter,
        } => scan(repo, config, output, repo_id, historian, arbiter).await,
    }
}

async fn scan(
    repo: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    repo_id: Option<String>,
    historian: bool,
    arbiter: bool,
) -> Result<()> {
    let mut settings = PipelineSettings::load(config.as_deref())?;
    if historian {
        settings.analysis.historian_enabled = true;
    }
    if arbiter {
        settings.analysis.arbiter_enabled = true;
    }

    let repo_id = repo_id.unwrap_or_else(|| {
        repo.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".into())
    });

    let store = Arc::new(MemoryStore::new());
    let pipeline = ScanPipeline::new(
        Roster::standard(&settings.llm.model),
        Arc::new(HttpLlm::new(&settings.llm.url, &settings.llm.api_key)),
        Arc::new(LocalRepo::new(&repo)),
        store.clone(),
        store,
        settings.analysis,
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling scan");
            signal_cancel.cancel();
        }
    });

    let request = ScanRequest {
        scan_id: None,
        repository_id: repo_id,
    };
    let outcome = match pipeline.run(request, cancel).await {
        Ok(outcome) => outcome,
        Err(ScanError::Cancelled) => {
            warn!("scan cancelled; no plan emitted");
            std::process::exit(130);
        }
        Err(e) => return Err(e).context("scan failed"),
    };

    for error in &outcome.errors {
        warn!(%error, "agent error during scan");
    }
    info!(
        scan_id = %outcome.scan_id,
        validated = outcome.validated.len(),
        rejected = outcome.rejected.len(),
        tasks = outcome.plan.prioritized_tasks.len(),
        "scan finished"
    );
    println!("{}", outcome.plan.summary);

    let rendered = serde_json::to_string_pretty(&outcome)?;
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "scan outcome written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
