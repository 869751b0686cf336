//! Domain models for MedBench.
//!
//! Canonical definitions for the core entities:
//! - `Benchmark`: cubes bound together for evaluation
//! - `Dataset`: a prepared dataset and its `Registration`
//! - `Cube`: an executable bundle exposing named tasks
//! - `ModelSelection`: which model a compatibility test runs
//! - `ExecutionResult`: output of one benchmark execution

pub mod benchmark;
pub mod cube;
pub mod dataset;
pub mod digest;
pub mod error;
pub mod result;
pub mod selection;

// Re-export main types and errors
pub use benchmark::Benchmark;
pub use cube::{Cube, CubeMetadata};
pub use dataset::{Dataset, DatasetState, Registration, RegistrationStatus};
pub use error::{CompatibilityError, MedbenchError, Result, ValidationError};
pub use result::{ExecutionResult, ResultRecord};
pub use selection::{synthesize_test_uid, ModelSelection};
