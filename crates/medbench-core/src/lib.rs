//! MedBench Core Library
//!
//! Domain entities, configuration, artifact storage and server access shared
//! by the execution engine and the `medbench` CLI.

pub mod comms;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod store;
pub mod telemetry;

pub use domain::{
    synthesize_test_uid, Benchmark, CompatibilityError, Cube, CubeMetadata, Dataset,
    DatasetState, ExecutionResult, MedbenchError, ModelSelection, Registration,
    RegistrationStatus, Result, ResultRecord, ValidationError,
};

pub use comms::{Comms, RestComms};
pub use config::MedbenchConfig;
pub use store::fs::FsArtifactStore;
pub use store::{check_cube_validity, manifest_tasks, write_json_atomic, ArtifactStore};
pub use telemetry::init_tracing;
