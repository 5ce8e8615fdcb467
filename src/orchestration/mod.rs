pub mod checkpoint_store;
pub mod error;
pub mod integrator;
pub mod prompt_render;
pub mod response_parse;
pub mod router;
pub mod state;
pub mod step;
pub mod step_context;
pub mod step_execution;
pub mod workflow_engine;

pub use checkpoint_store::{CheckpointKey, CheckpointStore, StepExchange};
pub use error::OrchestratorError;
pub use integrator::{integrate, integrate_from_checkpoints};
pub use router::{next_step, NextStep};
pub use state::{StepResult, WorkflowState};
pub use step::StepKind;
pub use step_context::StepContext;
pub use step_execution::StepExecutor;
pub use workflow_engine::{timestamped_run_dir, RunSummary, WorkflowEngine};
