pub mod plan;
pub mod worker;

pub use plan::{
    CodebaseInsight, ExecutionStrategy, OrchestrationPlan, PlanStatus, TaskDispatch,
    WorkerAssignment,
};
pub use worker::{
    Finding, Priority, Severity, WorkerConfig, WorkerDependencies, WorkerMetrics, WorkerOutput,
    WorkerReportStatus, WorkerSummary, WorkerType,
};
