//! Benchmark execution: inference then evaluation for one resolved
//! benchmark/dataset/model triple.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use medbench_core::obs;
use medbench_core::{
    check_cube_validity, ArtifactStore, Benchmark, Cube, Dataset, ExecutionResult,
    MedbenchConfig, MedbenchError, Result,
};
use tracing::{info, Instrument};

use crate::gate::CompatibilityGate;
use crate::runner::CubeRunner;
use crate::task::{CubeTask, TaskInvocation};

/// Collaborators shared by every execution of one process.
#[derive(Clone)]
pub struct ExecutionContext {
    pub store: Arc<dyn ArtifactStore>,
    pub runner: Arc<dyn CubeRunner>,
    pub cfg: Arc<MedbenchConfig>,
}

impl ExecutionContext {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        runner: Arc<dyn CubeRunner>,
        cfg: MedbenchConfig,
    ) -> Self {
        Self {
            store,
            runner,
            cfg: Arc::new(cfg),
        }
    }
}

/// Fully resolved identities of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub benchmark_uid: u64,
    pub data_uid: String,
    pub model_uid: String,
    /// Skip the model membership check.
    pub run_test: bool,
}

impl ExecutionRequest {
    pub fn new(benchmark_uid: u64, data_uid: impl Into<String>, model_uid: impl Into<String>) -> Self {
        Self {
            benchmark_uid,
            data_uid: data_uid.into(),
            model_uid: model_uid.into(),
            run_test: false,
        }
    }

    pub fn test_mode(mut self, run_test: bool) -> Self {
        self.run_test = run_test;
        self
    }
}

/// Lifecycle of a [`BenchmarkExecution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Created,
    Prepared,
    Validated,
    ArtifactsAcquired,
    InferenceComplete,
    EvaluationComplete,
    Aborted { reason: String },
}

impl ExecutionState {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionState::Created => "created",
            ExecutionState::Prepared => "prepared",
            ExecutionState::Validated => "validated",
            ExecutionState::ArtifactsAcquired => "artifacts_acquired",
            ExecutionState::InferenceComplete => "inference_complete",
            ExecutionState::EvaluationComplete => "evaluation_complete",
            ExecutionState::Aborted { .. } => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::EvaluationComplete | ExecutionState::Aborted { .. }
        )
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionState::Aborted { reason } => write!(f, "aborted: {}", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Handoff from the inference stage to the evaluation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOutput {
    /// Absolute path of the predictions written by the model.
    pub predictions_path: PathBuf,
}

/// One benchmark execution.
///
/// Stages must run in order: `prepare`, `validate`, `get_cubes`,
/// `run_inference`, `run_evaluation`. The first failing stage moves the
/// execution to [`ExecutionState::Aborted`] and every later call fails.
pub struct BenchmarkExecution {
    ctx: ExecutionContext,
    request: ExecutionRequest,
    state: ExecutionState,
    benchmark: Option<Benchmark>,
    dataset: Option<Dataset>,
    evaluator: Option<Cube>,
    model_cube: Option<Cube>,
}

impl BenchmarkExecution {
    pub fn new(ctx: ExecutionContext, request: ExecutionRequest) -> Self {
        Self {
            ctx,
            request,
            state: ExecutionState::Created,
            benchmark: None,
            dataset: None,
            evaluator: None,
            model_cube: None,
        }
    }

    /// Build and run an execution in one call.
    pub async fn execute(ctx: ExecutionContext, request: ExecutionRequest) -> Result<ExecutionResult> {
        Self::new(ctx, request).run().await
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn request(&self) -> &ExecutionRequest {
        &self.request
    }

    /// Run every stage.
    pub async fn run(&mut self) -> Result<ExecutionResult> {
        let span = obs::execution_span(
            self.request.benchmark_uid,
            &self.request.model_uid,
            &self.request.data_uid,
        );
        let start = Instant::now();
        let result = self.run_stages().instrument(span).await;
        obs::emit_execution_finished(start.elapsed().as_millis() as u64, result.is_ok());
        result
    }

    async fn run_stages(&mut self) -> Result<ExecutionResult> {
        self.prepare().await?;
        self.validate()?;
        self.get_cubes().await?;
        let inference = self.run_inference().await?;
        self.run_evaluation(&inference).await
    }

    /// Load the benchmark and the locally prepared dataset.
    pub async fn prepare(&mut self) -> Result<()> {
        self.expect_state(ExecutionState::Created, "prepare")?;
        let outcome = self.load().await;
        self.settle(outcome, ExecutionState::Prepared)
    }

    async fn load(&mut self) -> Result<()> {
        self.ctx.cfg.init_storage()?;
        let benchmark = self.ctx.store.get_benchmark(self.request.benchmark_uid).await?;
        obs::emit_execution_started(benchmark.uid, &benchmark.name, self.request.run_test);
        let dataset = self.ctx.store.get_dataset(&self.request.data_uid)?;
        self.benchmark = Some(benchmark);
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Apply the compatibility gate.
    pub fn validate(&mut self) -> Result<()> {
        self.expect_state(ExecutionState::Prepared, "validate")?;
        let outcome = match (&self.benchmark, &self.dataset) {
            (Some(benchmark), Some(dataset)) => CompatibilityGate::evaluate(
                benchmark,
                dataset,
                &self.request.model_uid,
                self.request.run_test,
            )
            .into_result(),
            _ => Err(self.missing("benchmark and dataset")),
        };
        self.settle(outcome, ExecutionState::Validated)
    }

    /// Fetch and check the evaluator and model cubes.
    pub async fn get_cubes(&mut self) -> Result<()> {
        self.expect_state(ExecutionState::Validated, "get_cubes")?;
        let outcome = self.fetch_cubes().await;
        self.settle(outcome, ExecutionState::ArtifactsAcquired)
    }

    async fn fetch_cubes(&mut self) -> Result<()> {
        let evaluator_uid = match &self.benchmark {
            Some(benchmark) => benchmark.data_evaluator_mlcube.clone(),
            None => return Err(self.missing("benchmark")),
        };

        info!(cube = %evaluator_uid, "retrieving evaluator cube");
        let evaluator = self.ctx.store.fetch_cube(&evaluator_uid).await?;
        check_cube_validity(&evaluator, &[CubeTask::Evaluate.name()])?;
        obs::emit_cube_retrieved("evaluator", &evaluator.uid);

        info!(cube = %self.request.model_uid, "retrieving model cube");
        let model_cube = self.ctx.store.fetch_cube(&self.request.model_uid).await?;
        check_cube_validity(&model_cube, &[CubeTask::Infer.name()])?;
        obs::emit_cube_retrieved("model", &model_cube.uid);

        self.evaluator = Some(evaluator);
        self.model_cube = Some(model_cube);
        Ok(())
    }

    /// Run the model's `infer` task on the prepared data.
    pub async fn run_inference(&mut self) -> Result<InferenceOutput> {
        self.expect_state(ExecutionState::ArtifactsAcquired, "run_inference")?;
        let outcome = self.infer().await;
        self.settle(outcome, ExecutionState::InferenceComplete)
    }

    async fn infer(&self) -> Result<InferenceOutput> {
        let (dataset, model_cube) = match (&self.dataset, &self.model_cube) {
            (Some(dataset), Some(model_cube)) => (dataset, model_cube),
            _ => return Err(self.missing("dataset and model cube")),
        };
        let model_output = &self.ctx.cfg.model_output;

        info!(cube = %model_cube.uid, "running model inference");
        let invocation = TaskInvocation::new(CubeTask::Infer)
            .param("data_path", &dataset.data_path)
            .param("output_path", model_output);
        self.ctx.runner.run(model_cube, &invocation).await?;

        Ok(InferenceOutput {
            predictions_path: model_cube.output_path(model_output),
        })
    }

    /// Run the evaluator on the predictions produced by inference.
    pub async fn run_evaluation(&mut self, inference: &InferenceOutput) -> Result<ExecutionResult> {
        self.expect_state(ExecutionState::InferenceComplete, "run_evaluation")?;
        let outcome = self.evaluate(inference).await;
        self.settle(outcome, ExecutionState::EvaluationComplete)
    }

    async fn evaluate(&self, inference: &InferenceOutput) -> Result<ExecutionResult> {
        let (dataset, evaluator) = match (&self.dataset, &self.evaluator) {
            (Some(dataset), Some(evaluator)) => (dataset, evaluator),
            _ => return Err(self.missing("dataset and evaluator cube")),
        };

        let results_path = self.ctx.cfg.results_path(
            self.request.benchmark_uid,
            &self.request.model_uid,
            &dataset.uid,
        );
        if let Some(parent) = results_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(cube = %evaluator.uid, "running evaluation");
        let invocation = TaskInvocation::new(CubeTask::Evaluate)
            .param("predictions", &inference.predictions_path)
            .param("labels", &dataset.labels_path)
            .param("output_path", &results_path);
        self.ctx.runner.run(evaluator, &invocation).await?;

        Ok(ExecutionResult {
            benchmark_uid: self.request.benchmark_uid,
            model_uid: self.request.model_uid.clone(),
            dataset_uid: dataset.uid.clone(),
            results_path,
            predictions_path: inference.predictions_path.clone(),
        })
    }

    fn expect_state(&self, expected: ExecutionState, stage: &str) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(MedbenchError::InvalidState(format!(
            "cannot {} from state '{}'",
            stage, self.state
        )))
    }

    fn missing(&self, what: &str) -> MedbenchError {
        MedbenchError::InvalidState(format!("{} not loaded in state '{}'", what, self.state))
    }

    /// Record the outcome of a stage: advance on success, abort on failure.
    fn settle<T>(&mut self, outcome: Result<T>, next: ExecutionState) -> Result<T> {
        match outcome {
            Ok(value) => {
                obs::emit_state_transition(self.state.name(), next.name());
                self.state = next;
                Ok(value)
            }
            Err(err) => {
                obs::emit_execution_aborted(self.state.name(), &err);
                self.state = ExecutionState::Aborted {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }
}
