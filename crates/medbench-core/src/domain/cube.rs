//! Executable cubes and their metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Metadata describing a cube, as served by the benchmark server and cached
/// next to the cube manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CubeMetadata {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    /// Task names the cube declares (e.g. `infer`, `evaluate`).
    #[serde(default)]
    pub tasks: Vec<String>,
    /// SHA-256 hex of the manifest file, when the server pinned one.
    #[serde(default)]
    pub manifest_hash: Option<String>,
    /// Remote location of the manifest, used when the cube is not cached.
    #[serde(default)]
    pub manifest_url: Option<String>,
}

impl CubeMetadata {
    pub fn new(uid: impl Into<String>, tasks: &[&str]) -> Self {
        Self {
            uid: uid.into(),
            name: String::new(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            manifest_hash: None,
            manifest_url: None,
        }
    }
}

/// A cube available on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cube {
    pub uid: String,
    /// Cube root directory (`<cubes>/<uid>`), possibly a symbolic link.
    pub path: PathBuf,
    pub manifest_filename: String,
    pub metadata: CubeMetadata,
}

impl Cube {
    pub fn new(path: PathBuf, manifest_filename: impl Into<String>, metadata: CubeMetadata) -> Self {
        Self {
            uid: metadata.uid.clone(),
            path,
            manifest_filename: manifest_filename.into(),
            metadata,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(&self.manifest_filename)
    }

    pub fn workspace_path(&self) -> PathBuf {
        self.path.join("workspace")
    }

    /// Absolute location of a path the cube writes relative to its workspace.
    pub fn output_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.workspace_path().join(rel)
    }

    pub fn declares_task(&self, task: &str) -> bool {
        self.metadata.tasks.iter().any(|t| t == task)
    }
}
