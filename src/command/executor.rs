//! Command executor - runs an assigned task through an external program

use dispatch_shared::{DroneId, TaskPayload};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variable carrying the drone's ID
pub const DRONE_ID_ENV: &str = "DRONE_ID";

/// Environment variable carrying the task's item ID
pub const ITEM_ID_ENV: &str = "DRONE_ITEM_ID";

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Program ran and exited successfully
    Completed { elapsed_ms: u64 },
    /// Program could not be started or exited unsuccessfully
    Failed { message: String },
}

/// Program used to carry out tasks
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Executable to launch
    pub program: String,
    /// Leading arguments; the task's actions are appended after these
    pub args: Vec<String>,
    /// Working directory, inherited when unset
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: "node".into(),
            args: vec!["./parrotAPI/runner.js".into()],
            working_dir: None,
        }
    }
}

/// Executes tasks received from the dispatch server
pub struct CommandExecutor {
    drone_id: DroneId,
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(drone_id: DroneId, config: ExecutorConfig) -> Self {
        Self { drone_id, config }
    }

    /// Run the task to completion
    ///
    /// Actions are passed in order as trailing arguments. Stdio is shared with the runner.
    pub async fn execute(&self, task: &TaskPayload) -> CommandResult {
        let start_time = Instant::now();

        info!(
            item_id = task.item_id,
            program = %self.config.program,
            "Running drone program"
        );
        debug!(actions = ?task.actions, "Task actions");

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .args(&task.actions)
            .env(DRONE_ID_ENV, self.drone_id.to_string())
            .env(ITEM_ID_ENV, task.item_id.to_string())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(ref dir) = self.config.working_dir {
            command.current_dir(dir);
        }

        match command.status().await {
            Ok(status) if status.success() => CommandResult::Completed {
                elapsed_ms: start_time.elapsed().as_millis() as u64,
            },
            Ok(status) => CommandResult::Failed {
                message: format!("{} exited with {}", self.config.program, status),
            },
            Err(e) => CommandResult::Failed {
                message: format!("failed to start {}: {}", self.config.program, e),
            },
        }
    }
}
