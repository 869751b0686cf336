use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use super::{manifest_tasks, write_json_atomic, ArtifactStore};
use crate::comms::Comms;
use crate::config::MedbenchConfig;
use crate::domain::error::{MedbenchError, Result};
use crate::domain::{Benchmark, Cube, CubeMetadata, Dataset, Registration};

/// Filesystem-backed artifact store with an optional remote fallback.
///
/// Layout under the storage root:
/// - `benchmarks/<uid>/benchmark.json`
/// - `cubes/<uid>/{mlcube.yaml, meta.json, workspace/}`
/// - `data/<uid>/{registration.json, data/, labels/}`
pub struct FsArtifactStore {
    cfg: MedbenchConfig,
    comms: Option<Arc<dyn Comms>>,
}

impl FsArtifactStore {
    /// Create a store over `cfg`'s storage root. Creates the layout if needed.
    pub fn new(cfg: MedbenchConfig) -> Result<Self> {
        cfg.init_storage()?;
        Ok(Self { cfg, comms: None })
    }

    /// Fetch artifacts missing from the local cache through `comms`.
    pub fn with_comms(mut self, comms: Arc<dyn Comms>) -> Self {
        self.comms = Some(comms);
        self
    }

    pub fn config(&self) -> &MedbenchConfig {
        &self.cfg
    }

    fn benchmark_file(&self, uid: u64) -> PathBuf {
        self.cfg
            .benchmarks_path()
            .join(uid.to_string())
            .join(&self.cfg.benchmark_filename)
    }

    fn cube_dir(&self, uid: &str) -> PathBuf {
        self.cfg.cubes_path().join(uid)
    }

    fn local_cube(&self, uid: &str) -> Result<Option<Cube>> {
        let dir = self.cube_dir(uid);
        if !dir.is_dir() {
            return Ok(None);
        }

        let meta_file = dir.join(&self.cfg.cube_metadata_filename);
        let metadata = if meta_file.is_file() {
            read_json::<CubeMetadata>(&meta_file)?
        } else {
            // Linked local cubes carry no metadata; read tasks off the manifest.
            let manifest = dir.join(&self.cfg.cube_filename);
            let tasks = match fs::read_to_string(&manifest) {
                Ok(text) => manifest_tasks(&text)?,
                Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            CubeMetadata {
                uid: uid.to_string(),
                name: uid.to_string(),
                tasks,
                manifest_hash: None,
                manifest_url: None,
            }
        };

        Ok(Some(Cube::new(dir, self.cfg.cube_filename.clone(), metadata)))
    }

    fn stage_cube(&self, staging: &Path, metadata: &CubeMetadata, manifest: &[u8]) -> Result<()> {
        fs::create_dir_all(staging.join("workspace"))?;
        fs::write(staging.join(&self.cfg.cube_filename), manifest)?;
        write_json_atomic(&staging.join(&self.cfg.cube_metadata_filename), metadata)?;
        Ok(())
    }

    fn remote(&self, kind: &'static str, uid: &str) -> Result<&Arc<dyn Comms>> {
        self.comms
            .as_ref()
            .ok_or_else(|| MedbenchError::not_found(kind, uid))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn get_benchmark(&self, uid: u64) -> Result<Benchmark> {
        let path = self.benchmark_file(uid);
        if path.is_file() {
            debug!(benchmark = uid, "loading cached benchmark");
            let benchmark: Benchmark = read_json(&path)?;
            return Ok(benchmark.with_models(Vec::<String>::new()));
        }

        let comms = self.remote("benchmark", &uid.to_string())?;
        info!(benchmark = uid, "retrieving benchmark from server");
        let models = comms.get_benchmark_models(uid).await?;
        let benchmark = comms.get_benchmark(uid).await?.with_models(models);
        write_json_atomic(&path, &benchmark)?;
        Ok(benchmark)
    }

    fn get_dataset(&self, uid: &str) -> Result<Dataset> {
        let dir = self.cfg.data_path().join(uid);
        let reg_file = dir.join(&self.cfg.registration_filename);
        if !reg_file.is_file() {
            return Err(MedbenchError::not_found("dataset", uid));
        }
        let registration: Registration = read_json(&reg_file)?;
        Ok(Dataset::from_registration(dir, registration))
    }

    async fn fetch_cube(&self, uid: &str) -> Result<Cube> {
        if let Some(cube) = self.local_cube(uid)? {
            debug!(cube = %uid, "using cached cube");
            return Ok(cube);
        }

        let comms = self.remote("cube", uid)?;
        info!(cube = %uid, "downloading cube");
        let metadata = comms.get_cube_metadata(uid).await?;
        let manifest = comms.download_manifest(&metadata).await?;

        // The cube directory appears complete or not at all.
        let dir = self.cube_dir(uid);
        let staging = self
            .cfg
            .cubes_path()
            .join(format!(".staging-{}", Uuid::new_v4().simple()));
        let outcome = self
            .stage_cube(&staging, &metadata, &manifest)
            .and_then(|()| Ok(fs::rename(&staging, &dir)?));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        outcome?;

        Ok(Cube::new(dir, self.cfg.cube_filename.clone(), metadata))
    }

    fn link_local_cube(&self, uid: &str, src: &Path) -> Result<PathBuf> {
        let dst = self.cube_dir(uid);
        if fs::symlink_metadata(&dst).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("cube storage entry {} already exists", dst.display()),
            )
            .into());
        }
        let src = fs::canonicalize(src)?;
        fs::create_dir_all(self.cfg.cubes_path())?;
        symlink_dir(&src, &dst)?;
        info!(src = %src.display(), dst = %dst.display(), "linked local cube");
        Ok(dst)
    }

    fn cubes_root(&self) -> PathBuf {
        self.cfg.cubes_path()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}
