pub mod outputs;
pub mod profiles;
pub mod prompt_data;
pub mod runner;
pub mod setup;
pub mod synthesis;

pub use outputs::WorkerReport;
pub use profiles::{WorkerProfile, profile};
pub use prompt_data::TaskContext;
pub use runner::{DEFAULT_WORKER_MODEL, WorkerRunner};
pub use setup::run_setup;
pub use synthesis::{SYNTHESIS_FILE, SynthesisOutcome, synthesize};
