//! HTTP long-poll task source talking to the dispatch server

use crate::transport::traits::TaskSource;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use dispatch_shared::{codec, routes, DroneId, DroneRequest, TaskPayload};
use std::time::Duration;
use tracing::debug;

/// Registers via `POST /connect` and follows the redirect to `GET /actions`
pub struct HttpTaskSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskSource {
    /// Create a source for the dispatch server at `host:port`
    ///
    /// Only connecting is bounded by `connect_timeout`; the long-poll itself has no deadline.
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("http://{}:{}", host, port),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn next_task(&self, drone_id: DroneId) -> Result<TaskPayload> {
        let url = format!("{}{}", self.base_url, routes::CONNECT);
        debug!(%url, %drone_id, "Registering with dispatch server");

        // The 302 to /actions is followed as a GET
        let response = self
            .client
            .post(&url)
            .json(&DroneRequest::new(drone_id))
            .send()
            .await
            .with_context(|| format!("connect request to {} failed", url))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("failed to read task response")?;

        if !status.is_success() {
            bail!(
                "dispatch server answered {}: {}",
                status,
                String::from_utf8_lossy(&body).trim_end()
            );
        }

        codec::decode_payload(&body).context("invalid task payload")
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}
