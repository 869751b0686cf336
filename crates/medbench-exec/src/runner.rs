//! Cube task execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use medbench_core::obs;
use medbench_core::{Cube, MedbenchConfig, MedbenchError, Result};
use tokio::process::Command;
use tracing::debug;

use crate::task::TaskInvocation;

/// Result of a successful task execution.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Cube uid.
    pub cube_uid: String,

    /// Task name.
    pub task: String,

    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

/// Runs a named task of a cube.
///
/// Implementations must return `Err` for any failed run; a returned
/// [`TaskResult`] always describes a successful one.
#[async_trait]
pub trait CubeRunner: Send + Sync {
    async fn run(&self, cube: &Cube, invocation: &TaskInvocation) -> Result<TaskResult>;
}

/// Runs cube tasks through the `mlcube` command line.
pub struct ProcessCubeRunner {
    bin: String,
    timeout_secs: u64,
}

impl ProcessCubeRunner {
    pub fn new(bin: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            bin: bin.into(),
            timeout_secs,
        }
    }

    pub fn from_config(cfg: &MedbenchConfig) -> Self {
        Self::new(cfg.mlcube_bin.clone(), cfg.task_timeout_secs)
    }

    /// `<bin> run --mlcube=<manifest> --task=<task> name=path...`
    pub fn command_line(&self, cube: &Cube, invocation: &TaskInvocation) -> Vec<String> {
        let mut cmd = vec![
            self.bin.clone(),
            "run".to_string(),
            format!("--mlcube={}", cube.manifest_path().display()),
            format!("--task={}", invocation.task.name()),
        ];
        cmd.extend(invocation.args());
        cmd
    }
}

#[async_trait]
impl CubeRunner for ProcessCubeRunner {
    async fn run(&self, cube: &Cube, invocation: &TaskInvocation) -> Result<TaskResult> {
        let start = Instant::now();
        let task = invocation.task.name();
        let cmd = self.command_line(cube, invocation);
        debug!(command = ?cmd, "running cube task");

        let child = Command::new(&cmd[0])
            .args(&cmd[1..])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = if self.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| MedbenchError::CubeExecution {
                uid: cube.uid.clone(),
                task: task.to_string(),
                exit_code: -1,
                stderr: format!("timed out after {} seconds", self.timeout_secs),
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        obs::emit_task_finished(&cube.uid, task, exit_code, duration_ms);

        if !output.status.success() {
            return Err(MedbenchError::CubeExecution {
                uid: cube.uid.clone(),
                task: task.to_string(),
                exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(TaskResult {
            cube_uid: cube.uid.clone(),
            task: task.to_string(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
        })
    }
}
