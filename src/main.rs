use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hive_forge::monitor::{Monitor, MonitorConfig, MonitorOutcome};
use hive_forge::orchestrator::{DEFAULT_ORCHESTRATOR_MODEL, Orchestrator};
use hive_forge::session::{COORDINATOR, EventLogger, SessionStore, event_types};
use hive_forge::worker::{DEFAULT_WORKER_MODEL, WorkerRunner, run_setup, synthesize};
use hive_forge::{HiveConfig, ModelRouter, WorkerType, load_project_env};

/// Hive-Forge CLI: multi-agent task orchestration over a shared session
#[derive(Parser, Debug)]
#[command(name = "hive-forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Session lifecycle operations
    #[command(subcommand)]
    Session(SessionCommand),

    /// Run queen orchestration for a session
    Orchestrate {
        /// Session ID
        #[arg(short, long)]
        session: String,

        /// Task description
        #[arg(short, long)]
        task: String,

        /// Logical model (e.g., "openai:gpt-4o", "custom:max-subscription")
        #[arg(long)]
        model: Option<String>,

        /// Keep monitoring workers after orchestration
        #[arg(long)]
        monitor: bool,

        /// Monitoring interval in seconds
        #[arg(long, default_value = "30")]
        monitor_interval: u64,
    },

    /// Run one worker invocation
    Worker {
        /// Worker type (e.g., "analyzer-worker")
        worker_type: String,

        /// Session ID
        #[arg(short, long)]
        session: String,

        /// Refined task focus for this worker
        #[arg(short, long)]
        task: String,

        /// Logical model
        #[arg(long)]
        model: Option<String>,

        /// Run the setup phase (skeleton files) instead of analysis
        #[arg(long)]
        setup: bool,

        /// Estimated duration recorded by the setup phase
        #[arg(long, default_value = "1-2h")]
        duration: String,
    },

    /// Monitor a session until all assigned workers complete
    Monitor {
        /// Session ID
        #[arg(short, long)]
        session: String,

        /// Monitoring interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Aggregate worker outputs into the synthesis artifact
    Synthesize {
        /// Session ID
        #[arg(short, long)]
        session: String,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Create a new session with complete scaffolding
    New {
        /// Task description
        #[arg(short, long)]
        task: String,

        /// Complexity level (1-4)
        #[arg(long, default_value = "2")]
        complexity: u8,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let component = component_name(&cli.command);
    if let Err(err) = run(cli).await {
        // One line on stderr naming the component and the error kind; the
        // full detail lives in DEBUG.jsonl.
        eprintln!(
            "hive-forge {} failed ({}): {}",
            component,
            hive_forge::errors::error_kind(&err),
            err
        );
        std::process::exit(1);
    }
}

fn component_name(command: &Command) -> &'static str {
    match command {
        Command::Session(_) => "session",
        Command::Orchestrate { .. } => "orchestrate",
        Command::Worker { .. } => "worker",
        Command::Monitor { .. } => "monitor",
        Command::Synthesize { .. } => "synthesize",
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = SessionStore::discover()?;
    load_project_env(store.project_root());
    let config = HiveConfig::load_with_env(cli.config.as_ref())?;

    match cli.command {
        Command::Session(SessionCommand::New { task, complexity }) => {
            handle_session_new(store, &task, complexity)
        }
        Command::Orchestrate {
            session,
            task,
            model,
            monitor,
            monitor_interval,
        } => {
            handle_orchestrate(
                store,
                &config,
                &session,
                &task,
                model,
                monitor,
                monitor_interval,
            )
            .await
        }
        Command::Worker {
            worker_type,
            session,
            task,
            model,
            setup,
            duration,
        } => handle_worker(store, &config, &worker_type, &session, &task, model, setup, &duration).await,
        Command::Monitor { session, interval } => {
            handle_monitor(store, &config, &session, interval).await
        }
        Command::Synthesize { session } => handle_synthesize(store, &session),
    }
}

fn handle_session_new(store: SessionStore, task: &str, complexity: u8) -> Result<()> {
    let created = store.create_session(task, complexity)?;

    let logger = EventLogger::new(store.clone(), &created.session_id, COORDINATOR);
    logger.event(
        event_types::SESSION_CREATED,
        serde_json::json!({
            "task": task,
            "complexity_level": complexity,
        }),
    );

    println!("Session created: {}", created.session_id);
    println!("Session path: {}", created.path.display());
    Ok(())
}

async fn handle_orchestrate(
    store: SessionStore,
    config: &HiveConfig,
    session: &str,
    task: &str,
    model: Option<String>,
    monitor: bool,
    monitor_interval: u64,
) -> Result<()> {
    let model = model
        .or_else(|| config.orchestrator.model_override.clone())
        .unwrap_or_else(|| DEFAULT_ORCHESTRATOR_MODEL.to_string());

    let router = Arc::new(ModelRouter::with_api_service(&config.model_service.base_url)?);
    let orchestrator = Orchestrator::new(store.clone(), router);

    let plan = orchestrator.run(session, task, &model).await?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    println!();
    println!("Orchestration complete: {} workers assigned", plan.worker_assignments.len());

    if monitor && !plan.worker_assignments.is_empty() {
        println!(
            "Starting continuous monitoring (checking every {}s)...",
            monitor_interval
        );
        let expected = plan
            .worker_assignments
            .iter()
            .map(|a| a.worker_type.as_str().to_string())
            .collect();
        let outcome = run_monitor_loop(
            store,
            session,
            expected,
            MonitorConfig {
                interval: std::time::Duration::from_secs(monitor_interval),
                stall_multiplier: config.monitor.stall_multiplier,
            },
        )
        .await?;
        print_monitor_outcome(&outcome);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_worker(
    store: SessionStore,
    config: &HiveConfig,
    worker_type: &str,
    session: &str,
    task: &str,
    model: Option<String>,
    setup: bool,
    duration: &str,
) -> Result<()> {
    let worker_type: WorkerType = worker_type
        .parse()
        .map_err(|err: String| anyhow::anyhow!(err))?;

    // The scribe aggregates; it never invokes a model
    if worker_type == WorkerType::Scribe {
        return handle_synthesize(store, session);
    }

    if setup {
        let report = run_setup(&store, session, worker_type, duration)?;
        println!(
            "{} setup complete for session {}",
            report.base.worker, session
        );
        return Ok(());
    }

    let model = model
        .or_else(|| config.worker.model_override.clone())
        .unwrap_or_else(|| DEFAULT_WORKER_MODEL.to_string());

    let router = Arc::new(ModelRouter::with_api_service(&config.model_service.base_url)?);
    let runner = WorkerRunner::new(store.clone(), router, worker_type);

    let report = tokio::select! {
        result = runner.run(session, task, &model) => result?,
        _ = tokio::signal::ctrl_c() => {
            let err = anyhow::anyhow!("worker interrupted by signal");
            runner.record_failure(session, &err);
            return Err(err);
        }
    };

    println!(
        "{} completed: {} findings, {} issues found",
        report.base.worker,
        report.findings.len(),
        report.base.metrics.issues_found
    );
    Ok(())
}

async fn handle_monitor(
    store: SessionStore,
    config: &HiveConfig,
    session: &str,
    interval: Option<u64>,
) -> Result<()> {
    store.ensure_session_exists(session)?;

    // Expected workers are the assigned configuration slots
    let state = store.read_state_typed(session)?;
    let expected: Vec<String> = state
        .worker_configs
        .keys()
        .filter(|worker| worker.as_str() != COORDINATOR)
        .cloned()
        .collect();

    if expected.is_empty() {
        println!("No workers assigned in session {}; nothing to monitor", session);
        return Ok(());
    }

    let outcome = run_monitor_loop(
        store,
        session,
        expected,
        MonitorConfig {
            interval: std::time::Duration::from_secs(
                interval.unwrap_or(config.monitor.interval_secs),
            ),
            stall_multiplier: config.monitor.stall_multiplier,
        },
    )
    .await?;

    print_monitor_outcome(&outcome);
    Ok(())
}

async fn run_monitor_loop(
    store: SessionStore,
    session: &str,
    expected: Vec<String>,
    config: MonitorConfig,
) -> Result<MonitorOutcome> {
    let monitor = Monitor::new(store, session, expected, config);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling monitor");
            signal_cancel.cancel();
        }
    });

    monitor.run(cancel).await
}

fn print_monitor_outcome(outcome: &MonitorOutcome) {
    match outcome {
        MonitorOutcome::AllCompleted => {
            println!("All workers completed; session is ready for synthesis.");
        }
        MonitorOutcome::Cancelled => {
            println!("Monitoring cancelled.");
        }
    }
}

fn handle_synthesize(store: SessionStore, session: &str) -> Result<()> {
    let outcome = synthesize(&store, session)?;
    println!(
        "Synthesis complete: {} ({} workers aggregated)",
        outcome.artifact_path.display(),
        outcome.sources.len()
    );
    Ok(())
}
