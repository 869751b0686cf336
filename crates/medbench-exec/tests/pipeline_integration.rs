//! Integration tests for benchmark execution with in-memory storage.

use medbench_core::fakes::MemoryArtifactStore;
use medbench_core::{Benchmark, Dataset, MedbenchConfig, MedbenchError, Registration};
use medbench_exec::fakes::RecordingCubeRunner;
use medbench_exec::{
    BenchmarkExecution, CubeTask, ExecutionContext, ExecutionRequest, ExecutionState,
};
use std::path::PathBuf;
use std::sync::Arc;

struct Fixture {
    _dir: tempfile::TempDir,
    cfg: MedbenchConfig,
    store: Arc<MemoryArtifactStore>,
    runner: Arc<RecordingCubeRunner>,
}

impl Fixture {
    fn ctx(&self) -> ExecutionContext {
        ExecutionContext::new(self.store.clone(), self.runner.clone(), self.cfg.clone())
    }

    fn dataset_root(&self, uid: &str) -> PathBuf {
        self.cfg.data_path().join(uid)
    }
}

/// Benchmark 1: preparation 10, reference 100, evaluator 200, models {100, 101}.
fn fixture(runner: RecordingCubeRunner) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cfg = MedbenchConfig::default().with_storage_root(dir.path());
    let store = MemoryArtifactStore::new(cfg.cubes_path());

    store.add_benchmark(Benchmark::new(1, "chest-xray", "10", "100", "200").with_models(["101"]));
    store.add_cube("200", &["evaluate"]).unwrap();
    store.add_cube("100", &["infer"]).unwrap();
    store.add_cube("101", &["infer"]).unwrap();

    let f = Fixture {
        _dir: dir,
        cfg,
        store: Arc::new(store),
        runner: Arc::new(runner),
    };
    add_dataset(&f, "d1", "10");
    add_dataset(&f, "d99", "99");
    f
}

fn add_dataset(f: &Fixture, uid: &str, prep: &str) {
    f.store.add_dataset(Dataset::from_registration(
        f.dataset_root(uid),
        Registration::local(uid, prep, uid),
    ));
}

/// Scenario A: a member model runs through inference and evaluation.
#[tokio::test]
async fn test_member_model_runs_to_completion() {
    let f = fixture(RecordingCubeRunner::new());
    let mut execution = BenchmarkExecution::new(f.ctx(), ExecutionRequest::new(1, "d1", "101"));

    let result = execution.run().await.expect("execution failed");

    assert_eq!(execution.state(), &ExecutionState::EvaluationComplete);
    assert_eq!(result.results_path, f.cfg.results_path(1, "101", "d1"));
    assert!(result.results_path.is_file(), "evaluator output missing");

    let model_workspace = f.cfg.cubes_path().join("101").join("workspace");
    assert_eq!(result.predictions_path, model_workspace.join("predictions"));
    assert!(result.predictions_path.is_dir(), "predictions missing");

    let calls = f.runner.calls();
    assert_eq!(calls.len(), 2);

    let (infer_cube, infer) = &calls[0];
    assert_eq!(infer_cube, "101");
    assert_eq!(infer.task, CubeTask::Infer);
    assert_eq!(infer.params["data_path"], f.dataset_root("d1").join("data"));
    assert_eq!(infer.params["output_path"], PathBuf::from("predictions"));

    let (eval_cube, evaluate) = &calls[1];
    assert_eq!(eval_cube, "200");
    assert_eq!(evaluate.task, CubeTask::Evaluate);
    assert_eq!(evaluate.params["predictions"], result.predictions_path);
    assert_eq!(evaluate.params["labels"], f.dataset_root("d1").join("labels"));
    assert_eq!(evaluate.params["output_path"], result.results_path);
}

/// Scenario B: a dataset prepared with another cube is rejected before any
/// cube is fetched.
#[tokio::test]
async fn test_preparation_mismatch_rejected_before_fetch() {
    let f = fixture(RecordingCubeRunner::new());
    let mut execution = BenchmarkExecution::new(f.ctx(), ExecutionRequest::new(1, "d99", "101"));

    let err = execution.run().await.unwrap_err();
    assert!(err.is_compatibility(), "expected compatibility error, got {err:?}");
    assert_eq!(f.store.cube_fetches(), 0);
    assert!(f.runner.calls().is_empty());
    assert!(matches!(execution.state(), ExecutionState::Aborted { .. }));
}

#[tokio::test]
async fn test_foreign_model_rejected_outside_test_mode() {
    let f = fixture(RecordingCubeRunner::new());
    f.store.add_cube("555", &["infer"]).unwrap();

    let err = BenchmarkExecution::execute(f.ctx(), ExecutionRequest::new(1, "d1", "555"))
        .await
        .unwrap_err();
    match err {
        MedbenchError::Validation(ref v) => {
            assert!(v.to_string().contains("not part of benchmark 1"), "{v}")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(f.store.cube_fetches(), 0);
}

#[tokio::test]
async fn test_foreign_model_allowed_in_test_mode() {
    let f = fixture(RecordingCubeRunner::new());
    f.store.add_cube("555", &["infer"]).unwrap();

    let request = ExecutionRequest::new(1, "d1", "555").test_mode(true);
    let result = BenchmarkExecution::execute(f.ctx(), request)
        .await
        .expect("test-mode execution failed");
    assert_eq!(result.model_uid, "555");
    assert!(result.results_path.is_file());
}

#[tokio::test]
async fn test_reference_model_is_always_a_member() {
    let f = fixture(RecordingCubeRunner::new());
    let result = BenchmarkExecution::execute(f.ctx(), ExecutionRequest::new(1, "d1", "100"))
        .await
        .expect("reference execution failed");
    assert_eq!(result.results_path, f.cfg.results_path(1, "100", "d1"));
}

#[tokio::test]
async fn test_stages_advance_state_machine() {
    let f = fixture(RecordingCubeRunner::new());
    let mut execution = BenchmarkExecution::new(f.ctx(), ExecutionRequest::new(1, "d1", "101"));
    assert_eq!(execution.state(), &ExecutionState::Created);

    execution.prepare().await.expect("prepare failed");
    assert_eq!(execution.state(), &ExecutionState::Prepared);

    execution.validate().expect("validate failed");
    assert_eq!(execution.state(), &ExecutionState::Validated);

    execution.get_cubes().await.expect("get_cubes failed");
    assert_eq!(execution.state(), &ExecutionState::ArtifactsAcquired);
    assert_eq!(f.store.cube_fetches(), 2);

    let inference = execution.run_inference().await.expect("inference failed");
    assert_eq!(execution.state(), &ExecutionState::InferenceComplete);
    assert!(inference.predictions_path.is_dir());

    let result = execution
        .run_evaluation(&inference)
        .await
        .expect("evaluation failed");
    assert_eq!(execution.state(), &ExecutionState::EvaluationComplete);
    assert_eq!(result.predictions_path, inference.predictions_path);
}

#[tokio::test]
async fn test_out_of_order_stage_is_rejected() {
    let f = fixture(RecordingCubeRunner::new());
    let mut execution = BenchmarkExecution::new(f.ctx(), ExecutionRequest::new(1, "d1", "101"));

    let err = execution.validate().unwrap_err();
    assert!(matches!(err, MedbenchError::InvalidState(_)));
    assert_eq!(execution.state(), &ExecutionState::Created);
}

#[tokio::test]
async fn test_inference_failure_aborts_before_evaluation() {
    let f = fixture(RecordingCubeRunner::failing_on(CubeTask::Infer));
    let mut execution = BenchmarkExecution::new(f.ctx(), ExecutionRequest::new(1, "d1", "101"));

    match execution.run().await {
        Err(MedbenchError::CubeExecution { uid, task, .. }) => {
            assert_eq!(uid, "101");
            assert_eq!(task, "infer");
        }
        other => panic!("expected CubeExecution, got {other:?}"),
    }
    assert_eq!(f.runner.tasks(), vec!["infer"]);
    assert!(!f.cfg.results_path(1, "101", "d1").exists());

    match execution.state() {
        ExecutionState::Aborted { reason } => assert!(reason.contains("infer")),
        other => panic!("expected Aborted, got {other:?}"),
    }

    // An aborted execution cannot be resumed.
    let err = execution.run().await.unwrap_err();
    assert!(matches!(err, MedbenchError::InvalidState(_)));
}

#[tokio::test]
async fn test_model_cube_without_infer_task_is_invalid() {
    let f = fixture(RecordingCubeRunner::new());
    f.store.add_cube("102", &["evaluate"]).unwrap();

    let request = ExecutionRequest::new(1, "d1", "102").test_mode(true);
    let err = BenchmarkExecution::execute(f.ctx(), request).await.unwrap_err();
    match err {
        MedbenchError::InvalidCube { uid, reason } => {
            assert_eq!(uid, "102");
            assert!(reason.contains("infer"));
        }
        other => panic!("expected InvalidCube, got {other:?}"),
    }
    assert!(f.runner.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_dataset_is_not_found() {
    let f = fixture(RecordingCubeRunner::new());
    let mut execution =
        BenchmarkExecution::new(f.ctx(), ExecutionRequest::new(1, "missing", "101"));

    let err = execution.run().await.unwrap_err();
    assert!(matches!(err, MedbenchError::NotFound { kind: "dataset", .. }));
    assert!(matches!(execution.state(), ExecutionState::Aborted { .. }));
}

#[tokio::test]
async fn test_linked_local_cube_runs_in_test_mode() {
    use medbench_core::ArtifactStore;

    let f = fixture(RecordingCubeRunner::new());
    let local = f._dir.path().join("local-model");
    std::fs::create_dir_all(local.join("workspace")).unwrap();
    std::fs::write(
        local.join("mlcube.yaml"),
        "tasks:\n  infer:\n    parameters: {}\n",
    )
    .unwrap();

    f.store.link_local_cube("test_local", &local).unwrap();
    assert_eq!(f.store.links()["test_local"], local);

    let request = ExecutionRequest::new(1, "d1", "test_local").test_mode(true);
    let mut execution = BenchmarkExecution::new(f.ctx(), request);
    assert!(execution.request().run_test);

    let result = execution.run().await.expect("linked cube execution failed");
    assert_eq!(result.predictions_path, local.join("workspace/predictions"));
}
