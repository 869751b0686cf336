//! Storage layout and runtime settings.
//!
//! A [`MedbenchConfig`] is built once at program start and passed to every
//! component that needs a path, filename or prefix.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::Result;

/// MedBench configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedbenchConfig {
    /// Root of all local storage.
    pub storage_root: PathBuf,
    pub benchmarks_dir: String,
    pub cubes_dir: String,
    pub data_dir: String,
    pub results_dir: String,
    pub demo_dir: String,
    /// Manifest every cube directory must contain.
    pub cube_filename: String,
    pub cube_metadata_filename: String,
    pub benchmark_filename: String,
    pub registration_filename: String,
    pub results_filename: String,
    /// Upload receipt written next to submitted results.
    pub submission_filename: String,
    /// Prefix of uids synthesized for local test cubes.
    pub test_cube_prefix: String,
    /// Where models write predictions, relative to the cube workspace.
    pub model_output: String,
    /// Benchmark server base URL.
    pub server_url: Option<String>,
    /// Bearer token for the benchmark server.
    pub auth_token: Option<String>,
    /// Executable used to run cube tasks.
    pub mlcube_bin: String,
    /// Per-task timeout in seconds (0 = none).
    pub task_timeout_secs: u64,
}

impl Default for MedbenchConfig {
    fn default() -> Self {
        MedbenchConfig {
            storage_root: PathBuf::from(".medbench"),
            benchmarks_dir: "benchmarks".to_string(),
            cubes_dir: "cubes".to_string(),
            data_dir: "data".to_string(),
            results_dir: "results".to_string(),
            demo_dir: "demo".to_string(),
            cube_filename: "mlcube.yaml".to_string(),
            cube_metadata_filename: "meta.json".to_string(),
            benchmark_filename: "benchmark.json".to_string(),
            registration_filename: "registration.json".to_string(),
            results_filename: "results.json".to_string(),
            submission_filename: "submission.json".to_string(),
            test_cube_prefix: "test_".to_string(),
            model_output: "predictions".to_string(),
            server_url: None,
            auth_token: None,
            mlcube_bin: "mlcube".to_string(),
            task_timeout_secs: 0,
        }
    }
}

impl MedbenchConfig {
    /// Defaults overridden by `MEDBENCH_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(root) = std::env::var("MEDBENCH_STORAGE") {
            cfg.storage_root = PathBuf::from(root);
        }
        cfg.server_url = std::env::var("MEDBENCH_SERVER").ok();
        cfg.auth_token = std::env::var("MEDBENCH_TOKEN").ok();
        if let Ok(bin) = std::env::var("MEDBENCH_MLCUBE_BIN") {
            cfg.mlcube_bin = bin;
        }
        if let Some(secs) = std::env::var("MEDBENCH_TASK_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.task_timeout_secs = secs;
        }
        cfg
    }

    pub fn with_storage_root(mut self, root: impl AsRef<Path>) -> Self {
        self.storage_root = root.as_ref().to_path_buf();
        self
    }

    pub fn benchmarks_path(&self) -> PathBuf {
        self.storage_root.join(&self.benchmarks_dir)
    }

    pub fn cubes_path(&self) -> PathBuf {
        self.storage_root.join(&self.cubes_dir)
    }

    pub fn data_path(&self) -> PathBuf {
        self.storage_root.join(&self.data_dir)
    }

    pub fn demo_path(&self) -> PathBuf {
        self.storage_root.join(&self.demo_dir)
    }

    pub fn results_root(&self) -> PathBuf {
        self.storage_root.join(&self.results_dir)
    }

    /// Deterministic location of the evaluation output for a
    /// `(benchmark, model, dataset)` triple.
    pub fn results_path(&self, benchmark_uid: u64, model_uid: &str, dataset_uid: &str) -> PathBuf {
        self.results_root()
            .join(benchmark_uid.to_string())
            .join(model_uid)
            .join(dataset_uid)
            .join(&self.results_filename)
    }

    /// Create every storage directory.
    pub fn init_storage(&self) -> Result<()> {
        for dir in [
            self.benchmarks_path(),
            self.cubes_path(),
            self.data_path(),
            self.demo_path(),
            self.results_root(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
