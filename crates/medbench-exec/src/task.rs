//! Cube task definitions and invocation parameters.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tasks MedBench invokes on cubes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CubeTask {
    /// Data preparation: raw data + labels -> prepared dataset
    Prepare,

    /// Data preparation: verify the prepared dataset
    SanityCheck,

    /// Data preparation: summary statistics of the prepared dataset
    Statistics,

    /// Model: prepared data -> predictions
    Infer,

    /// Evaluator: predictions + labels -> metrics
    Evaluate,
}

impl CubeTask {
    /// Task name as declared in cube manifests.
    pub fn name(&self) -> &'static str {
        match self {
            CubeTask::Prepare => "prepare",
            CubeTask::SanityCheck => "sanity_check",
            CubeTask::Statistics => "statistics",
            CubeTask::Infer => "infer",
            CubeTask::Evaluate => "evaluate",
        }
    }
}

impl std::fmt::Display for CubeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A task plus its path-valued parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskInvocation {
    pub task: CubeTask,

    /// Named path parameters, passed as `name=path`.
    pub params: BTreeMap<String, PathBuf>,
}

impl TaskInvocation {
    pub fn new(task: CubeTask) -> Self {
        Self {
            task,
            params: BTreeMap::new(),
        }
    }

    /// Add a named path parameter.
    pub fn param(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.params.insert(name.to_string(), path.into());
        self
    }

    /// `name=path` arguments in parameter-name order.
    pub fn args(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.display()))
            .collect()
    }
}
