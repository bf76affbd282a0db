pub mod assessment;
pub mod queen;
pub mod selection;

pub use assessment::{TaskAssessment, assess_task, estimate_complexity};
pub use queen::{DEFAULT_ORCHESTRATOR_MODEL, Orchestrator};
pub use selection::{MAX_WORKERS, fallback_plan, select_workers};
