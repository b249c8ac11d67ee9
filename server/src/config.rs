//! Server configuration
//!
//! Values come from the environment (a `.env` file is honoured):
//! - `DISPATCH_BIND_ADDR`: listen address, default `0.0.0.0:9000`
//! - `DISPATCH_REGISTER_TIMEOUT_SECS`: registration deadline, unset means wait forever
//! - `DISPATCH_COLLECT_TIMEOUT_SECS`: time a released drone has to fetch its task
//! - `DISPATCH_REAP_INTERVAL_MS`: how often uncollected tasks are swept

use anyhow::{Context, Result};
use dispatch_shared::limits;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Timing policy for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Deadline for a parked registration; `None` keeps the long-poll open indefinitely
    pub register_timeout: Option<Duration>,
    /// How long an assigned task may wait for its drone's `GET /actions`
    pub collect_timeout: Duration,
    /// Interval between uncollected-task sweeps
    pub reap_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            register_timeout: None,
            collect_timeout: Duration::from_millis(limits::COLLECT_TIMEOUT_MS),
            reap_interval: Duration::from_millis(limits::REAP_INTERVAL_MS),
        }
    }
}

/// Configuration for the dispatch server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub dispatch: DispatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], limits::DEFAULT_PORT)),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse::<SocketAddr>(&lookup, "DISPATCH_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse::<u64>(&lookup, "DISPATCH_REGISTER_TIMEOUT_SECS")? {
            config.dispatch.register_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = parse::<u64>(&lookup, "DISPATCH_COLLECT_TIMEOUT_SECS")? {
            config.dispatch.collect_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse::<u64>(&lookup, "DISPATCH_REAP_INTERVAL_MS")? {
            anyhow::ensure!(ms > 0, "DISPATCH_REAP_INTERVAL_MS must be positive");
            config.dispatch.reap_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        _ => Ok(None),
    }
}
