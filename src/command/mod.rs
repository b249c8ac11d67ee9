//! Task execution on the drone
//!
//! This module handles:
//! - Launching the flight program for an assigned task
//! - Passing the ordered actions and task identity to it
//! - Reporting how the run ended

mod executor;

pub use executor::{CommandExecutor, CommandResult, ExecutorConfig};
