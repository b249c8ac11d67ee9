//! Connection management for the dispatch long-poll
//!
//! This module handles:
//! - Registering with the dispatch server and waiting for a task
//! - Automatic reconnection with exponential backoff

mod manager;

pub use manager::{ConnectionConfig, ConnectionManager};
