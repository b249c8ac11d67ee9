//! Drone Dispatch Shared Protocol Types
//!
//! This crate provides the wire types, identifier parsing and JSON codec shared by
//! the dispatch server and the drone runner.

pub mod codec;
pub mod state_machine;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use codec::CodecError;

/// HTTP routes exposed by the dispatch server
pub mod routes {
    /// Drone registration (long-poll)
    pub const CONNECT: &str = "/connect";

    /// Task retrieval (GET) and task submission (POST)
    pub const ACTIONS: &str = "/actions";

    /// Query parameter carrying the drone ID on `GET /actions`
    pub const ID_PARAM: &str = "id";

    /// Build the redirect target handed to a released drone
    pub fn actions_location(drone_id: super::DroneId) -> String {
        format!("{}?{}={}", ACTIONS, ID_PARAM, drone_id)
    }
}

/// Error strings that are part of the observable HTTP contract
pub mod messages {
    pub const NOT_FOUND: &str = "not found";
    pub const METHOD_NOT_ALLOWED: &str = "method not allowed";
    pub const NO_DRONE_WITH_ID: &str = "no drone found with this ID";
    pub const NO_AVAILABLE_DRONES: &str = "no available drones";
    pub const ALREADY_QUEUED: &str = "drone already queued";
    pub const REGISTRATION_TIMED_OUT: &str = "registration timed out";
    pub const WORKER_GONE: &str = "drone disconnected before handoff";
    pub const CANCELLED: &str = "registration cancelled";
}

/// Timing parameters for the dispatch system
pub mod limits {
    /// Default port the dispatch server listens on
    pub const DEFAULT_PORT: u16 = 9000;

    /// How long a released drone has to fetch its task before the entry is evicted
    pub const COLLECT_TIMEOUT_MS: u64 = 30_000;

    /// How often the server sweeps for uncollected entries
    pub const REAP_INTERVAL_MS: u64 = 1000;

    /// Initial delay before a runner reconnects after a failure
    pub const RECONNECT_DELAY_MS: u64 = 1000;

    /// Upper bound for the runner's reconnect backoff
    pub const MAX_RECONNECT_DELAY_MS: u64 = 30_000;
}

/// Identifier a drone supplies when it registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DroneId(pub i64);

impl DroneId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DroneId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        codec::parse_int(s, "droneID").map(DroneId)
    }
}

/// Registration body posted by a drone to `/connect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneRequest {
    #[serde(rename = "droneID")]
    pub drone_id: String,
}

impl DroneRequest {
    pub fn new(drone_id: DroneId) -> Self {
        Self {
            drone_id: drone_id.to_string(),
        }
    }
}

/// Task submission body posted by a pilot to `/actions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsRequest {
    #[serde(rename = "itemID")]
    pub item_id: String,
    /// Missing or `null` is forwarded as an empty list
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<String>,
    /// Hand the task to this drone only; any waiting drone when absent
    #[serde(rename = "droneID", default, skip_serializing_if = "Option::is_none")]
    pub drone_id: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Unit of work handed to exactly one drone
///
/// `actions` is ordered: it is the execution order on the drone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(rename = "ItemID")]
    pub item_id: i64,
    #[serde(rename = "Actions")]
    pub actions: Vec<String>,
}

impl TaskPayload {
    pub fn new(item_id: i64, actions: Vec<String>) -> Self {
        Self { item_id, actions }
    }
}
