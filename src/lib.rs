pub mod config;
pub mod errors;
pub mod models;
pub mod monitor;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod session;
pub mod slug;
pub mod worker;

// Re-export main types
pub use config::{HiveConfig, load_project_env};
pub use errors::HiveError;
pub use models::{
    ExecutionStrategy, Finding, OrchestrationPlan, Priority, Severity, TaskDispatch,
    WorkerAssignment, WorkerConfig, WorkerOutput, WorkerType,
};
pub use monitor::{Monitor, MonitorConfig, MonitorOutcome};
pub use orchestrator::{DEFAULT_ORCHESTRATOR_MODEL, Orchestrator, assess_task, fallback_plan};
pub use prompts::PromptGenerator;
pub use router::{ApiServiceBackend, ModelBackend, ModelMessage, ModelResponse, ModelRouter};
pub use session::{EventLogger, SessionState, SessionStore};
pub use worker::{DEFAULT_WORKER_MODEL, WorkerReport, WorkerRunner, run_setup, synthesize};

// Re-export slug utilities
pub use slug::{generate_session_id, is_valid_session_id, session_slug, slugify};
