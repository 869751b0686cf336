//! In-memory fakes for the store and comms traits (testing only)
//!
//! Provides `MemoryArtifactStore` and `MemoryComms` that satisfy the trait
//! contracts without touching the network.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::comms::Comms;
use crate::domain::error::{MedbenchError, Result};
use crate::domain::{Benchmark, Cube, CubeMetadata, Dataset, ResultRecord};
use crate::store::{manifest_tasks, ArtifactStore};

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// Artifact store backed by hash maps. Cubes still point at real directories
/// so that runners can write into their workspaces.
#[derive(Debug)]
pub struct MemoryArtifactStore {
    cubes_root: PathBuf,
    manifest_filename: String,
    benchmarks: Mutex<HashMap<u64, Benchmark>>,
    datasets: Mutex<HashMap<String, Dataset>>,
    cubes: Mutex<HashMap<String, Cube>>,
    links: Mutex<HashMap<String, PathBuf>>,
    cube_fetches: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new(cubes_root: impl Into<PathBuf>) -> Self {
        Self {
            cubes_root: cubes_root.into(),
            manifest_filename: "mlcube.yaml".to_string(),
            benchmarks: Mutex::new(HashMap::new()),
            datasets: Mutex::new(HashMap::new()),
            cubes: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
            cube_fetches: AtomicUsize::new(0),
        }
    }

    pub fn add_benchmark(&self, benchmark: Benchmark) {
        let benchmark = benchmark.with_models(Vec::<String>::new());
        self.benchmarks.lock().unwrap().insert(benchmark.uid, benchmark);
    }

    pub fn add_dataset(&self, dataset: Dataset) {
        self.datasets
            .lock()
            .unwrap()
            .insert(dataset.uid.clone(), dataset);
    }

    /// Register a cube under `<cubes_root>/<uid>` with a manifest declaring `tasks`.
    pub fn add_cube(&self, uid: &str, tasks: &[&str]) -> io::Result<Cube> {
        let dir = self.cubes_root.join(uid);
        std::fs::create_dir_all(dir.join("workspace"))?;
        let mut manifest = String::from("tasks:\n");
        for task in tasks {
            manifest.push_str(&format!("  {}:\n    parameters: {{}}\n", task));
        }
        std::fs::write(dir.join(&self.manifest_filename), manifest)?;

        let cube = Cube::new(dir, self.manifest_filename.clone(), CubeMetadata::new(uid, tasks));
        self.cubes
            .lock()
            .unwrap()
            .insert(uid.to_string(), cube.clone());
        Ok(cube)
    }

    /// Number of `fetch_cube` calls so far.
    pub fn cube_fetches(&self) -> usize {
        self.cube_fetches.load(Ordering::SeqCst)
    }

    /// Links created through `link_local_cube`.
    pub fn links(&self) -> HashMap<String, PathBuf> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get_benchmark(&self, uid: u64) -> Result<Benchmark> {
        self.benchmarks
            .lock()
            .unwrap()
            .get(&uid)
            .cloned()
            .ok_or_else(|| MedbenchError::not_found("benchmark", uid))
    }

    fn get_dataset(&self, uid: &str) -> Result<Dataset> {
        self.datasets
            .lock()
            .unwrap()
            .get(uid)
            .cloned()
            .ok_or_else(|| MedbenchError::not_found("dataset", uid))
    }

    async fn fetch_cube(&self, uid: &str) -> Result<Cube> {
        self.cube_fetches.fetch_add(1, Ordering::SeqCst);
        self.cubes
            .lock()
            .unwrap()
            .get(uid)
            .cloned()
            .ok_or_else(|| MedbenchError::not_found("cube", uid))
    }

    fn link_local_cube(&self, uid: &str, src: &Path) -> Result<PathBuf> {
        let mut links = self.links.lock().unwrap();
        let mut cubes = self.cubes.lock().unwrap();
        if links.contains_key(uid) || cubes.contains_key(uid) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, uid.to_string()).into());
        }
        let manifest = std::fs::read_to_string(src.join(&self.manifest_filename))?;
        let metadata = CubeMetadata {
            uid: uid.to_string(),
            name: uid.to_string(),
            tasks: manifest_tasks(&manifest)?,
            manifest_hash: None,
            manifest_url: None,
        };
        cubes.insert(
            uid.to_string(),
            Cube::new(src.to_path_buf(), self.manifest_filename.clone(), metadata),
        );
        links.insert(uid.to_string(), src.to_path_buf());
        Ok(self.cubes_root.join(uid))
    }

    fn cubes_root(&self) -> PathBuf {
        self.cubes_root.clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryComms
// ---------------------------------------------------------------------------

/// Benchmark server fake that counts requests and keeps uploaded results.
#[derive(Debug, Default)]
pub struct MemoryComms {
    benchmarks: Mutex<HashMap<u64, (Benchmark, Vec<String>)>>,
    cubes: Mutex<HashMap<String, (CubeMetadata, Vec<u8>)>>,
    uploads: Mutex<Vec<ResultRecord>>,
    benchmark_requests: AtomicUsize,
    manifest_downloads: AtomicUsize,
}

impl MemoryComms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_benchmark(&self, benchmark: Benchmark, models: &[&str]) {
        let models = models.iter().map(|m| m.to_string()).collect();
        self.benchmarks
            .lock()
            .unwrap()
            .insert(benchmark.uid, (benchmark, models));
    }

    pub fn add_cube(&self, metadata: CubeMetadata, manifest: &[u8]) {
        self.cubes
            .lock()
            .unwrap()
            .insert(metadata.uid.clone(), (metadata, manifest.to_vec()));
    }

    pub fn uploads(&self) -> Vec<ResultRecord> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn benchmark_requests(&self) -> usize {
        self.benchmark_requests.load(Ordering::SeqCst)
    }

    pub fn manifest_downloads(&self) -> usize {
        self.manifest_downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Comms for MemoryComms {
    async fn get_benchmark(&self, uid: u64) -> Result<Benchmark> {
        self.benchmark_requests.fetch_add(1, Ordering::SeqCst);
        self.benchmarks
            .lock()
            .unwrap()
            .get(&uid)
            .map(|(b, _)| b.clone())
            .ok_or_else(|| MedbenchError::not_found("benchmark", uid))
    }

    async fn get_benchmark_models(&self, uid: u64) -> Result<Vec<String>> {
        self.benchmarks
            .lock()
            .unwrap()
            .get(&uid)
            .map(|(_, models)| models.clone())
            .ok_or_else(|| MedbenchError::not_found("benchmark", uid))
    }

    async fn get_cube_metadata(&self, uid: &str) -> Result<CubeMetadata> {
        self.cubes
            .lock()
            .unwrap()
            .get(uid)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| MedbenchError::not_found("cube", uid))
    }

    async fn download_manifest(&self, metadata: &CubeMetadata) -> Result<Vec<u8>> {
        self.manifest_downloads.fetch_add(1, Ordering::SeqCst);
        self.cubes
            .lock()
            .unwrap()
            .get(&metadata.uid)
            .map(|(_, manifest)| manifest.clone())
            .ok_or_else(|| MedbenchError::not_found("cube", &metadata.uid))
    }

    async fn upload_result(&self, record: &ResultRecord) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        let mut record = record.clone();
        record.submitted = true;
        uploads.push(record);
        Ok(uploads.len().to_string())
    }
}
