//! Execution outputs and result records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of one benchmark execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub benchmark_uid: u64,
    pub model_uid: String,
    pub dataset_uid: String,
    /// File written by the evaluator.
    pub results_path: PathBuf,
    /// Predictions produced by the model and consumed by the evaluator.
    pub predictions_path: PathBuf,
}

/// Results of one execution as sent to the benchmark server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub benchmark: u64,
    pub model: String,
    pub dataset: String,
    pub results: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted: bool,
}

impl ResultRecord {
    pub fn new(
        benchmark: u64,
        model: impl Into<String>,
        dataset: impl Into<String>,
        results: serde_json::Value,
    ) -> Self {
        Self {
            benchmark,
            model: model.into(),
            dataset: dataset.into(),
            results,
            created_at: Utc::now(),
            submitted: false,
        }
    }
}
