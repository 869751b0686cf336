//! MedBench Exec - benchmark execution engine
//!
//! Provides:
//! - `BenchmarkExecution`: inference then evaluation for a resolved
//!   benchmark/dataset/model triple, behind a compatibility gate
//! - `CompatibilityTestExecution`: resolves a test request (dataset, model
//!   or local cube) and runs it in test mode
//! - Data preparation, result submission and cube task runners

pub mod fakes;
pub mod gate;
pub mod pipeline;
pub mod prepare;
pub mod runner;
pub mod submit;
pub mod task;

// Re-export key types
pub use compat_test::{
    CompatibilityTestExecution, CompatibilityTestRequest, TestOutcome, TestParameters,
};
pub use gate::{CompatVerdict, CompatibilityGate};
pub use pipeline::{
    BenchmarkExecution, ExecutionContext, ExecutionRequest, ExecutionState, InferenceOutput,
};
pub use prepare::{
    CubeDataPreparation, DataPreparation, DemoData, DemoDataSource, LocalDemoData,
};
pub use runner::{CubeRunner, ProcessCubeRunner, TaskResult};
pub use submit::{ResultEntry, ResultSubmission, ResultsList};
pub use task::{CubeTask, TaskInvocation};
