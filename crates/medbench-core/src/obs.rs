//! Structured observability hooks for benchmark executions.
//!
//! This module provides:
//! - An execution-scoped tracing span via `execution_span`
//! - Emission functions for key lifecycle events: start, state transition,
//!   cube retrieval, task completion, finish, test-parameter evaluation
//!
//! These events double as progress reporting for long-running executions.
//! Verbosity follows `RUST_LOG`.

use tracing::info;

/// Span tagged with the execution triple.
///
/// Attach it to the execution future with `tracing::Instrument` so every
/// event emitted while the execution runs carries the three uids.
///
/// # Example
///
/// ```ignore
/// execution.run().instrument(execution_span(1, "101", "d1")).await
/// ```
pub fn execution_span(benchmark_uid: u64, model_uid: &str, dataset_uid: &str) -> tracing::Span {
    tracing::info_span!(
        "medbench.execution",
        benchmark = benchmark_uid,
        model = %model_uid,
        dataset = %dataset_uid,
    )
}

/// Emit event: execution started for a benchmark.
pub fn emit_execution_started(benchmark_uid: u64, benchmark_name: &str, run_test: bool) {
    info!(
        event = "execution.started",
        benchmark = benchmark_uid,
        name = %benchmark_name,
        run_test = run_test,
    );
}

/// Emit event: the execution state machine moved to a new state.
pub fn emit_state_transition(from: &str, to: &str) {
    tracing::debug!(event = "execution.transition", from = %from, to = %to);
}

/// Emit event: a cube is available locally and passed validation.
pub fn emit_cube_retrieved(role: &str, cube_uid: &str) {
    info!(event = "cube.retrieved", role = %role, cube = %cube_uid);
}

/// Emit event: a cube task finished.
pub fn emit_task_finished(cube_uid: &str, task: &str, exit_code: i32, duration_ms: u64) {
    info!(
        event = "cube.task_finished",
        cube = %cube_uid,
        task = %task,
        exit_code = exit_code,
        duration_ms = duration_ms,
    );
}

/// Emit event: execution finished, successfully or not.
pub fn emit_execution_finished(duration_ms: u64, success: bool) {
    info!(
        event = "execution.finished",
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: the test dimensions supplied to a compatibility test.
pub fn emit_test_parameters(dataset: bool, model: bool, local_model: bool) {
    tracing::debug!(
        event = "compat_test.parameters",
        dataset_provided = dataset,
        model_provided = model,
        local_model_provided = local_model,
    );
}

/// Emit event: execution aborted (warning level).
pub fn emit_execution_aborted(state: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "execution.aborted", state = %state, error = %error);
}
