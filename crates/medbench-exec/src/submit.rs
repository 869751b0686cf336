//! Result upload and local result listing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use medbench_core::{write_json_atomic, Comms, MedbenchConfig, MedbenchError, Result, ResultRecord};
use serde::Serialize;
use tracing::info;

/// Uploads the results of one execution.
pub struct ResultSubmission {
    cfg: Arc<MedbenchConfig>,
    comms: Arc<dyn Comms>,
}

impl ResultSubmission {
    pub fn new(cfg: Arc<MedbenchConfig>, comms: Arc<dyn Comms>) -> Self {
        Self { cfg, comms }
    }

    /// Read the results written for `(benchmark, model, dataset)`, upload
    /// them and leave a receipt next to them. Returns the server-side id.
    pub async fn run(&self, benchmark_uid: u64, data_uid: &str, model_uid: &str) -> Result<String> {
        let path = self.cfg.results_path(benchmark_uid, model_uid, data_uid);
        if !path.is_file() {
            return Err(MedbenchError::not_found(
                "results",
                path.display().to_string(),
            ));
        }
        let results: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;

        let record = ResultRecord::new(benchmark_uid, model_uid, data_uid, results);
        let id = self.comms.upload_result(&record).await?;
        info!(benchmark = benchmark_uid, model = %model_uid, dataset = %data_uid, id = %id, "results uploaded");

        let receipt = ResultRecord {
            submitted: true,
            ..record
        };
        write_json_atomic(&self.receipt_path(&path), &receipt)?;
        Ok(id)
    }

    fn receipt_path(&self, results_path: &Path) -> PathBuf {
        results_path.with_file_name(&self.cfg.submission_filename)
    }
}

/// One results file found in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub benchmark_uid: u64,
    pub model_uid: String,
    pub dataset_uid: String,
    pub path: PathBuf,
    pub submitted: bool,
}

/// Lists results under `results/<benchmark>/<model>/<dataset>/`.
pub struct ResultsList;

impl ResultsList {
    pub fn run(cfg: &MedbenchConfig) -> Result<Vec<ResultEntry>> {
        let root = cfg.results_root();
        let mut entries = Vec::new();
        if !root.is_dir() {
            return Ok(entries);
        }

        for (benchmark, benchmark_dir) in subdirs(&root)? {
            // Directories not named by a benchmark uid are not ours.
            let Ok(benchmark_uid) = benchmark.parse::<u64>() else {
                continue;
            };
            for (model_uid, model_dir) in subdirs(&benchmark_dir)? {
                for (dataset_uid, dataset_dir) in subdirs(&model_dir)? {
                    let path = dataset_dir.join(&cfg.results_filename);
                    if !path.is_file() {
                        continue;
                    }
                    entries.push(ResultEntry {
                        benchmark_uid,
                        model_uid: model_uid.clone(),
                        dataset_uid,
                        submitted: dataset_dir.join(&cfg.submission_filename).is_file(),
                        path,
                    });
                }
            }
        }

        entries.sort_by(|a, b| {
            (a.benchmark_uid, &a.model_uid, &a.dataset_uid).cmp(&(
                b.benchmark_uid,
                &b.model_uid,
                &b.dataset_uid,
            ))
        });
        Ok(entries)
    }
}

fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            dirs.push((name.to_string(), path.clone()));
        }
    }
    Ok(dirs)
}
