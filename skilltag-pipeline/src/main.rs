//! skilltag-pipeline - Course skill proficiency tagging
//!
//! Reads a skills framework and a course table, classifies every in-sector
//! course/skill pair in two reconciled rounds, and writes CSV partitions.
//! Ctrl+C stops the run between batches; rerunning with the same sector
//! alias resumes from the saved checkpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use skilltag_common::config::{config_file_path, load_or_default, resolve_root_folder, LoggingConfig};
use skilltag_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skilltag_pipeline::checkpoint::{CheckpointStore, FileCheckpointStore, SqliteCheckpointStore};
use skilltag_pipeline::config::{
    resolve_api_key, resolve_dir, ClassifierSettings, PipelineOverrides, PipelineSettings,
};
use skilltag_pipeline::models::RunOutcome;
use skilltag_pipeline::services::{
    Classifier, LlmClassifier, RunInputs, StubClassifier, WorkflowOrchestrator,
};
use skilltag_pipeline::{tables, AppState, PipelineError};

/// Checkpoint persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckpointBackend {
    /// One JSON document per run in the checkpoint directory
    File,
    /// `checkpoints.db` SQLite database in the checkpoint directory
    Sqlite,
}

/// Command-line arguments for skilltag-pipeline
#[derive(Parser, Debug)]
#[command(name = "skilltag-pipeline")]
#[command(about = "Tag course skills with framework proficiency levels")]
#[command(version)]
struct Args {
    /// Skills framework table (CSV)
    #[arg(long)]
    framework: PathBuf,

    /// Course table (CSV)
    #[arg(long)]
    courses: PathBuf,

    /// Framework sector in scope (repeat for several)
    #[arg(long = "sector", required = true)]
    sectors: Vec<String>,

    /// Prefix for checkpoints and artifacts
    #[arg(long, env = "SKILLTAG_SECTOR_ALIAS")]
    sector_alias: String,

    /// Discard any checkpoint for the sector alias and start over
    #[arg(long)]
    fresh: bool,

    /// Artifact directory (default: <root>/output)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Checkpoint directory (default: <root>/checkpoints)
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = CheckpointBackend::File)]
    checkpoint_backend: CheckpointBackend,

    /// Root folder for default directories
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: SKILLTAG_CONFIG or the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve the status API on this address while the run executes
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Use the deterministic offline classifier instead of the live service
    #[arg(long)]
    stub_classifier: bool,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    rate_limit_every: Option<u64>,

    #[arg(long)]
    rate_limit_cooldown_secs: Option<u64>,

    #[arg(long)]
    checkpoint_every: Option<usize>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let default_filter = format!(
        "skilltag_pipeline={level},skilltag_common={level},tower_http=info",
        level = logging.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let file_layer = match &logging.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config_file_path(args.config.as_deref());
    let toml_config = load_or_default(config_path.as_deref());
    init_tracing(&toml_config.logging)?;

    info!("Starting skilltag-pipeline");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve directories
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let output_dir = resolve_dir(
        args.output_dir.as_deref(),
        toml_config.pipeline.output_dir.as_deref(),
        &root_folder,
        "output",
    );
    let checkpoint_dir = resolve_dir(
        args.checkpoint_dir.as_deref(),
        toml_config.pipeline.checkpoint_dir.as_deref(),
        &root_folder,
        "checkpoints",
    );
    info!("Output directory: {}", output_dir.display());
    info!("Checkpoint directory: {}", checkpoint_dir.display());

    // Step 2: Pipeline settings and classifier
    let overrides = PipelineOverrides {
        batch_size: args.batch_size,
        rate_limit_every: args.rate_limit_every,
        rate_limit_cooldown_secs: args.rate_limit_cooldown_secs,
        checkpoint_every: args.checkpoint_every,
    };
    let settings = PipelineSettings::resolve(&overrides, &toml_config.pipeline)?;

    let classifier: Arc<dyn Classifier> = if args.stub_classifier {
        warn!("Using stub classifier, levels are synthetic");
        Arc::new(StubClassifier::new())
    } else {
        let api_key = resolve_api_key(&toml_config)?;
        let classifier_settings = ClassifierSettings::from_toml(&toml_config.classifier, api_key);
        Arc::new(
            LlmClassifier::new(classifier_settings)
                .context("Failed to initialize classification client")?,
        )
    };

    // Step 3: Checkpoint store
    let store: Arc<dyn CheckpointStore> = match args.checkpoint_backend {
        CheckpointBackend::File => Arc::new(FileCheckpointStore::new(&checkpoint_dir)),
        CheckpointBackend::Sqlite => {
            tokio::fs::create_dir_all(&checkpoint_dir)
                .await
                .context("Failed to create checkpoint directory")?;
            Arc::new(
                SqliteCheckpointStore::open(&checkpoint_dir.join("checkpoints.db"))
                    .await
                    .context("Failed to open checkpoint database")?,
            )
        }
    };

    // Step 4: Input tables
    let inputs = RunInputs {
        framework: tables::read_framework(&args.framework)?,
        courses: tables::read_courses(&args.courses)?,
        sectors: args.sectors.clone(),
        sector_alias: args.sector_alias.clone(),
        fresh: args.fresh,
    };

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(1000);
    let state = AppState::new(event_bus.clone());

    let orchestrator =
        WorkflowOrchestrator::new(classifier, store, settings, &output_dir, event_bus)
            .with_session_handle(state.session.clone());

    // Ctrl+C requests a stop between batches
    let cancel_token = CancellationToken::new();
    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            shutdown_signal().await;
            cancel_token.cancel();
        }
    });

    // Optional status API
    let server_shutdown = CancellationToken::new();
    let server = match args.listen {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            info!("Status API listening on http://{}", addr);
            let app = skilltag_pipeline::build_router(state.clone());
            let shutdown = server_shutdown.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
            }))
        }
        None => None,
    };

    let result = orchestrator.execute(inputs, cancel_token).await;
    if let Err(e) = &result {
        *state.last_error.write().await = Some(e.to_string());
    }

    server_shutdown.cancel();
    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Status API error: {}", e),
            Err(e) => warn!("Status API task failed: {}", e),
        }
    }

    match result {
        Ok(RunOutcome::Completed(report)) => {
            info!(
                run_id = %report.run_id,
                valid = report.valid.len(),
                invalid = report.invalid.len(),
                out_of_sector = report.out_of_sector.len(),
                missing_content = report.missing_content.len(),
                poor_quality = report.poor_quality.len(),
                "Run complete"
            );
            for path in &report.artifacts {
                info!("Artifact: {}", path.display());
            }
            Ok(())
        }
        Ok(RunOutcome::Stopped {
            run_id,
            round,
            pending,
        }) => {
            info!(
                run_id = %run_id,
                round = round.number(),
                pending,
                "Run stopped; rerun with --sector-alias {} to resume",
                args.sector_alias
            );
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            if matches!(e, PipelineError::Persistence(_)) {
                warn!(
                    "Rerun with --fresh to discard the checkpoints for {} and start over",
                    args.sector_alias
                );
            }
            Err(e.into())
        }
    }
}

/// Resolves on Ctrl+C (or SIGTERM on unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping after the current batch");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping after the current batch");
        },
    }
}
