mod command;
mod connection;
mod transport;

use clap::Parser;
use command::{CommandExecutor, CommandResult, ExecutorConfig};
use connection::{ConnectionConfig, ConnectionManager};
use dispatch_shared::{limits, DroneId};
use std::path::PathBuf;
use std::time::Duration;
use transport::HttpTaskSource;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Long-poll the dispatch server and run each assigned task
#[derive(Parser, Debug)]
#[command(name = "drone-runner", version)]
struct Args {
    /// Dispatch server host
    #[arg(long, default_value = "localhost")]
    ip: String,

    /// Dispatch server port
    #[arg(long, default_value_t = limits::DEFAULT_PORT)]
    port: u16,

    /// ID this drone registers under
    #[arg(long, default_value_t = 1)]
    drone_id: i64,

    /// Program that carries out a task
    #[arg(long, default_value = "node")]
    program: String,

    /// Arguments placed before the task's actions
    #[arg(long = "arg", default_values_t = vec!["./parrotAPI/runner.js".to_string()])]
    args: Vec<String>,

    /// Working directory for the program
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Connection timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    connect_timeout_ms: u64,

    /// Initial reconnect delay in milliseconds
    #[arg(long, default_value_t = limits::RECONNECT_DELAY_MS)]
    reconnect_delay_ms: u64,

    /// Maximum reconnect delay in milliseconds
    #[arg(long, default_value_t = limits::MAX_RECONNECT_DELAY_MS)]
    max_reconnect_delay_ms: u64,

    /// Exit after this many consecutive connection failures
    #[arg(long)]
    max_failures: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let drone_id = DroneId::new(args.drone_id);

    let source = HttpTaskSource::new(
        &args.ip,
        args.port,
        Duration::from_millis(args.connect_timeout_ms),
    )?;
    info!("Drone {} starting", drone_id);
    info!("  Dispatch server: {}", source.base_url());

    let config = ConnectionConfig {
        drone_id,
        reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
        max_reconnect_delay: Duration::from_millis(args.max_reconnect_delay_ms),
        max_failures: args.max_failures,
    };
    let conn = ConnectionManager::new(config, source);

    let executor = CommandExecutor::new(
        drone_id,
        ExecutorConfig {
            program: args.program,
            args: args.args,
            working_dir: args.workdir,
        },
    );

    // Main loop: register, run the task, register again
    loop {
        let task = match conn.next_task().await {
            Ok(task) => task,
            Err(e) => {
                error!("Connection manager stopped: {:#}", e);
                return Err(e);
            }
        };
        info!(
            drone_id = %conn.drone_id(),
            item_id = task.item_id,
            actions = task.actions.len(),
            "Task received"
        );

        match executor.execute(&task).await {
            CommandResult::Completed { elapsed_ms } => {
                info!(item_id = task.item_id, elapsed_ms, "Task completed");
            }
            CommandResult::Failed { message } => {
                warn!(item_id = task.item_id, "Task failed: {}", message);
            }
        }
    }
}
