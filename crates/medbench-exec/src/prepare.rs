//! Data preparation and demo data.
//!
//! A prepared dataset lives under `data/<generated_uid>/` where the uid is
//! the folder digest of the prepared data. Registrations written here stay
//! local; nothing is sent to the server.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use medbench_core::domain::digest::folder_digest;
use medbench_core::{
    check_cube_validity, write_json_atomic, Benchmark, MedbenchConfig, MedbenchError,
    Registration, Result,
};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::pipeline::ExecutionContext;
use crate::task::{CubeTask, TaskInvocation};

/// Raw inputs shipped with a benchmark for test runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoData {
    pub data_path: PathBuf,
    pub labels_path: PathBuf,
}

/// Resolves a benchmark's demo data.
#[async_trait]
pub trait DemoDataSource: Send + Sync {
    async fn get(&self, benchmark: &Benchmark) -> Result<DemoData>;
}

/// Demo data unpacked under `<demo_root>/<benchmark_uid>/{data,labels}`.
pub struct LocalDemoData {
    root: PathBuf,
}

impl LocalDemoData {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(cfg: &MedbenchConfig) -> Self {
        Self::new(cfg.demo_path())
    }
}

#[async_trait]
impl DemoDataSource for LocalDemoData {
    async fn get(&self, benchmark: &Benchmark) -> Result<DemoData> {
        let dir = self.root.join(benchmark.uid.to_string());
        let demo = DemoData {
            data_path: dir.join("data"),
            labels_path: dir.join("labels"),
        };
        if !demo.data_path.exists() || !demo.labels_path.exists() {
            return Err(MedbenchError::not_found(
                "demo data",
                dir.display().to_string(),
            ));
        }
        debug!(benchmark = benchmark.uid, path = %dir.display(), "using local demo data");
        Ok(demo)
    }
}

/// Turns raw data into a prepared dataset and returns its uid.
#[async_trait]
pub trait DataPreparation: Send + Sync {
    async fn run(
        &self,
        benchmark_uid: u64,
        data_path: &Path,
        labels_path: &Path,
        run_test: bool,
    ) -> Result<String>;
}

/// Prepares data with the benchmark's data preparation cube.
///
/// Runs `prepare`, `sanity_check` and `statistics` in a staging directory,
/// then moves the output to its content-addressed location.
pub struct CubeDataPreparation {
    ctx: ExecutionContext,
}

impl CubeDataPreparation {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self { ctx }
    }

    async fn prepare_into(
        &self,
        staging: &Path,
        benchmark: &Benchmark,
        data_path: &Path,
        labels_path: &Path,
        run_test: bool,
    ) -> Result<String> {
        let cube = self
            .ctx
            .store
            .fetch_cube(&benchmark.data_preparation_mlcube)
            .await?;
        check_cube_validity(
            &cube,
            &[
                CubeTask::Prepare.name(),
                CubeTask::SanityCheck.name(),
                CubeTask::Statistics.name(),
            ],
        )?;

        let out_data = staging.join("data");
        let out_labels = staging.join("labels");
        let stats_path = staging.join("statistics.json");

        info!(cube = %cube.uid, "running data preparation");
        let prepare = TaskInvocation::new(CubeTask::Prepare)
            .param("data_path", data_path)
            .param("labels_path", labels_path)
            .param("output_path", &out_data)
            .param("output_labels_path", &out_labels);
        self.ctx.runner.run(&cube, &prepare).await?;

        let sanity = TaskInvocation::new(CubeTask::SanityCheck)
            .param("data_path", &out_data)
            .param("labels_path", &out_labels);
        self.ctx.runner.run(&cube, &sanity).await?;

        let statistics = TaskInvocation::new(CubeTask::Statistics)
            .param("data_path", &out_data)
            .param("labels_path", &out_labels)
            .param("output_path", &stats_path);
        self.ctx.runner.run(&cube, &statistics).await?;

        let generated_uid = folder_digest(&out_data)?;
        let dest = self.ctx.cfg.data_path().join(&generated_uid);
        if dest.exists() {
            info!(dataset = %generated_uid, "dataset already prepared");
            return Ok(generated_uid);
        }

        let statistics = match fs::read_to_string(&stats_path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::Value::Null,
            Err(e) => return Err(e.into()),
        };

        let name = if run_test {
            format!("{}_test", benchmark.name)
        } else {
            benchmark.name.clone()
        };
        let mut registration =
            Registration::local(name, &benchmark.data_preparation_mlcube, &generated_uid);
        registration.location = data_path.display().to_string();
        registration.input_data_hash = folder_digest(data_path)?;
        registration.metadata = json!({
            "statistics": statistics,
            "run_test": run_test,
        });
        write_json_atomic(
            &staging.join(&self.ctx.cfg.registration_filename),
            &registration,
        )?;

        fs::rename(staging, &dest)?;
        info!(dataset = %generated_uid, path = %dest.display(), "dataset prepared");
        Ok(generated_uid)
    }
}

#[async_trait]
impl DataPreparation for CubeDataPreparation {
    async fn run(
        &self,
        benchmark_uid: u64,
        data_path: &Path,
        labels_path: &Path,
        run_test: bool,
    ) -> Result<String> {
        self.ctx.cfg.init_storage()?;
        let benchmark = self.ctx.store.get_benchmark(benchmark_uid).await?;

        let staging = self
            .ctx
            .cfg
            .data_path()
            .join(format!(".staging-{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&staging)?;

        let outcome = self
            .prepare_into(&staging, &benchmark, data_path, labels_path, run_test)
            .await;
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingCubeRunner;
    use medbench_core::{ArtifactStore, FsArtifactStore};
    use std::sync::Arc;

    struct Fixture {
        _dir: tempfile::TempDir,
        cfg: MedbenchConfig,
        store: Arc<FsArtifactStore>,
        runner: Arc<RecordingCubeRunner>,
        demo: DemoData,
    }

    fn fixture(runner: RecordingCubeRunner) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MedbenchConfig::default().with_storage_root(dir.path().join("store"));
        let store = FsArtifactStore::new(cfg.clone()).unwrap();

        let benchmark = Benchmark::new(1, "brain", "10", "100", "200");
        let bench_file = cfg.benchmarks_path().join("1").join(&cfg.benchmark_filename);
        write_json_atomic(&bench_file, &benchmark).unwrap();

        let cube_dir = cfg.cubes_path().join("10");
        fs::create_dir_all(cube_dir.join("workspace")).unwrap();
        fs::write(
            cube_dir.join(&cfg.cube_filename),
            "tasks:\n  prepare:\n    parameters: {}\n  sanity_check:\n    parameters: {}\n  statistics:\n    parameters: {}\n",
        )
        .unwrap();

        let demo_dir = cfg.demo_path().join("1");
        fs::create_dir_all(demo_dir.join("data")).unwrap();
        fs::create_dir_all(demo_dir.join("labels")).unwrap();
        fs::write(demo_dir.join("data/scan.csv"), "1,2,3").unwrap();

        let demo = DemoData {
            data_path: demo_dir.join("data"),
            labels_path: demo_dir.join("labels"),
        };
        Fixture {
            _dir: dir,
            cfg,
            store: Arc::new(store),
            runner: Arc::new(runner),
            demo,
        }
    }

    fn preparation(f: &Fixture) -> CubeDataPreparation {
        CubeDataPreparation::new(ExecutionContext::new(
            f.store.clone(),
            f.runner.clone(),
            f.cfg.clone(),
        ))
    }

    #[tokio::test]
    async fn test_local_demo_data_resolves_layout() {
        let f = fixture(RecordingCubeRunner::new());
        let source = LocalDemoData::from_config(&f.cfg);
        let benchmark = Benchmark::new(1, "brain", "10", "100", "200");
        assert_eq!(source.get(&benchmark).await.unwrap(), f.demo);
    }

    #[tokio::test]
    async fn test_missing_demo_data_is_not_found() {
        let f = fixture(RecordingCubeRunner::new());
        let source = LocalDemoData::from_config(&f.cfg);
        let benchmark = Benchmark::new(2, "other", "10", "100", "200");
        let err = source.get(&benchmark).await.unwrap_err();
        assert!(matches!(err, MedbenchError::NotFound { kind: "demo data", .. }));
    }

    #[tokio::test]
    async fn test_preparation_registers_dataset_locally() {
        let f = fixture(RecordingCubeRunner::new());
        let uid = preparation(&f)
            .run(1, &f.demo.data_path, &f.demo.labels_path, true)
            .await
            .expect("preparation failed");

        assert_eq!(f.runner.tasks(), vec!["prepare", "sanity_check", "statistics"]);

        let dataset = f.store.get_dataset(&uid).expect("dataset not registered");
        assert_eq!(dataset.preparation_cube_uid, "10");
        assert!(dataset.data_path.is_dir());
        assert!(dataset.labels_path.is_dir());
        assert!(!dataset.registration.is_submitted());
        assert_eq!(dataset.registration.name, "brain_test");
        assert_eq!(dataset.registration.metadata["run_test"], true);
        assert_eq!(folder_digest(&dataset.data_path).unwrap(), uid);
    }

    #[tokio::test]
    async fn test_preparation_is_content_addressed() {
        let f = fixture(RecordingCubeRunner::new());
        let prep = preparation(&f);
        let first = prep
            .run(1, &f.demo.data_path, &f.demo.labels_path, true)
            .await
            .unwrap();
        let second = prep
            .run(1, &f.demo.data_path, &f.demo.labels_path, true)
            .await
            .unwrap();
        assert_eq!(first, second);

        let entries: Vec<_> = fs::read_dir(f.cfg.data_path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "staging directories must be cleaned up");
    }

    #[tokio::test]
    async fn test_failed_sanity_check_leaves_no_dataset() {
        let f = fixture(RecordingCubeRunner::failing_on(CubeTask::SanityCheck));
        let err = preparation(&f)
            .run(1, &f.demo.data_path, &f.demo.labels_path, true)
            .await
            .unwrap_err();
        assert!(matches!(err, MedbenchError::CubeExecution { .. }));
        assert_eq!(f.runner.tasks(), vec!["prepare", "sanity_check"]);
        assert_eq!(fs::read_dir(f.cfg.data_path()).unwrap().count(), 0);
    }
}
