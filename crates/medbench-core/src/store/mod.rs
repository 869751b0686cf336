pub mod fs;

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::digest::file_digest;
use crate::domain::error::{MedbenchError, Result};
use crate::domain::{Benchmark, Cube, Dataset};

/// Resolves benchmarks, datasets and cubes by uid.
///
/// Stored artifacts are immutable: an implementation may add entries to its
/// cache but never rewrites an existing one.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Load a benchmark. `models` always contains the reference model.
    async fn get_benchmark(&self, uid: u64) -> Result<Benchmark>;

    /// Load a prepared dataset from local storage.
    fn get_dataset(&self, uid: &str) -> Result<Dataset>;

    /// Make a cube available locally, downloading it if needed.
    async fn fetch_cube(&self, uid: &str) -> Result<Cube>;

    /// Link a local cube directory into cube storage under `uid`.
    ///
    /// Fails with an io error of kind `AlreadyExists` when `uid` is taken.
    fn link_local_cube(&self, uid: &str, src: &Path) -> Result<PathBuf>;

    /// Directory holding one subdirectory per cube uid.
    fn cubes_root(&self) -> PathBuf;
}

/// Check that a fetched cube is usable for `required_tasks`.
///
/// The manifest must exist, every required task must be declared and, when
/// the metadata pins a manifest hash, the manifest must match it.
pub fn check_cube_validity(cube: &Cube, required_tasks: &[&str]) -> Result<()> {
    let manifest = cube.manifest_path();
    if !manifest.is_file() {
        return Err(MedbenchError::InvalidCube {
            uid: cube.uid.clone(),
            reason: format!("missing manifest {}", manifest.display()),
        });
    }

    if let Some(missing) = required_tasks.iter().find(|t| !cube.declares_task(t)) {
        return Err(MedbenchError::InvalidCube {
            uid: cube.uid.clone(),
            reason: format!("task '{}' is not declared", missing),
        });
    }

    if let Some(expected) = &cube.metadata.manifest_hash {
        let actual = file_digest(&manifest)?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(MedbenchError::InvalidCube {
                uid: cube.uid.clone(),
                reason: format!("manifest hash mismatch: expected {}, got {}", expected, actual),
            });
        }
    }

    Ok(())
}

/// Task names declared under the top-level `tasks` mapping of a cube manifest.
pub fn manifest_tasks(manifest: &str) -> Result<Vec<String>> {
    let doc: serde_yaml::Value = serde_yaml::from_str(manifest)?;
    let tasks = match doc.get("tasks") {
        Some(serde_yaml::Value::Mapping(tasks)) => tasks
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    Ok(tasks)
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| MedbenchError::InvalidConfig(format!("no parent for {}", path.display())))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(value)?)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
