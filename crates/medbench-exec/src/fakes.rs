//! Cube runner fake (testing only)

use std::sync::Mutex;

use async_trait::async_trait;
use medbench_core::{Cube, MedbenchError, Result};

use crate::runner::{CubeRunner, TaskResult};
use crate::task::{CubeTask, TaskInvocation};

/// Records every invocation and fakes each task's outputs.
///
/// `output_path` is created: tasks whose output is a directory (`prepare`,
/// `infer`) get a directory with one file in it, the others get a JSON file.
/// Relative output paths resolve against the cube workspace. `prepare` also
/// fills `output_labels_path` when given.
#[derive(Debug, Default)]
pub struct RecordingCubeRunner {
    calls: Mutex<Vec<(String, TaskInvocation)>>,
    fail_on: Option<CubeTask>,
}

impl RecordingCubeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose `task` exits with code 1.
    pub fn failing_on(task: CubeTask) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(task),
        }
    }

    /// `(cube uid, invocation)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, TaskInvocation)> {
        self.calls.lock().unwrap().clone()
    }

    /// Task names in call order.
    pub fn tasks(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, inv)| inv.task.name())
            .collect()
    }

    fn write_output(cube: &Cube, invocation: &TaskInvocation) -> std::io::Result<()> {
        let Some(output) = invocation.params.get("output_path") else {
            return Ok(());
        };
        let output = if output.is_absolute() {
            output.clone()
        } else {
            cube.output_path(output)
        };

        match invocation.task {
            CubeTask::Prepare | CubeTask::Infer => {
                if let Some(labels) = invocation.params.get("output_labels_path") {
                    std::fs::create_dir_all(labels)?;
                    std::fs::write(labels.join("labels.csv"), "id,label\n")?;
                }
                std::fs::create_dir_all(&output)?;
                std::fs::write(
                    output.join(format!("{}.txt", invocation.task)),
                    format!("{} by {}", invocation.task, cube.uid),
                )
            }
            _ => {
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let body = serde_json::json!({ "cube": cube.uid, "task": invocation.task.name() });
                std::fs::write(&output, body.to_string())
            }
        }
    }
}

#[async_trait]
impl CubeRunner for RecordingCubeRunner {
    async fn run(&self, cube: &Cube, invocation: &TaskInvocation) -> Result<TaskResult> {
        self.calls
            .lock()
            .unwrap()
            .push((cube.uid.clone(), invocation.clone()));

        if self.fail_on == Some(invocation.task) {
            return Err(MedbenchError::CubeExecution {
                uid: cube.uid.clone(),
                task: invocation.task.name().to_string(),
                exit_code: 1,
                stderr: "simulated failure".to_string(),
            });
        }

        Self::write_output(cube, invocation)?;
        Ok(TaskResult {
            cube_uid: cube.uid.clone(),
            task: invocation.task.name().to_string(),
            exit_code: 0,
            stdout: format!("ran {}", invocation.task),
            stderr: String::new(),
            duration_ms: 0,
        })
    }
}
