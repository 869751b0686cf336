//! Domain-level error taxonomy for MedBench.

/// Benchmark/dataset/model combinations rejected by the compatibility gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompatibilityError {
    #[error(
        "dataset {dataset_uid} was prepared with cube {actual}, benchmark requires cube {expected}"
    )]
    PreparationCubeMismatch {
        dataset_uid: String,
        expected: String,
        actual: String,
    },

    #[error("model {model_uid} is not part of benchmark {benchmark_uid}")]
    ModelNotInBenchmark { model_uid: String, benchmark_uid: u64 },
}

/// Bad or ambiguous caller input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("too many test parameters: only one element can be tested at a time")]
    TooManyTestParameters,

    #[error("no test parameter: at least one testing element must be passed")]
    NoTestParameter,

    #[error("invalid cube path {path}: must be a directory containing an mlcube manifest")]
    InvalidCubePath { path: String },

    #[error("incompatible execution: {0}")]
    Compatibility(#[from] CompatibilityError),
}

/// MedBench domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MedbenchError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {uid}")]
    NotFound { kind: &'static str, uid: String },

    #[error("invalid cube {uid}: {reason}")]
    InvalidCube { uid: String, reason: String },

    #[error("cube {uid} task '{task}' failed with exit code {exit_code}: {stderr}")]
    CubeExecution {
        uid: String,
        task: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("remote error: {0}")]
    Remote(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid execution state: {0}")]
    InvalidState(String),

    #[error("invalid cube manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MedbenchError {
    pub fn not_found(kind: &'static str, uid: impl ToString) -> Self {
        MedbenchError::NotFound {
            kind,
            uid: uid.to_string(),
        }
    }

    /// Whether this error came from caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, MedbenchError::Validation(_))
    }

    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            MedbenchError::Validation(ValidationError::Compatibility(_))
        )
    }
}

impl From<CompatibilityError> for MedbenchError {
    fn from(err: CompatibilityError) -> Self {
        MedbenchError::Validation(ValidationError::Compatibility(err))
    }
}

impl From<reqwest::Error> for MedbenchError {
    fn from(err: reqwest::Error) -> Self {
        MedbenchError::Remote(err.to_string())
    }
}

/// Result type for MedBench domain operations.
pub type Result<T> = std::result::Result<T, MedbenchError>;
