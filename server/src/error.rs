//! Errors surfaced by the dispatch core

use dispatch_shared::state_machine::{LifecycleEvent, WorkerStatus};
use dispatch_shared::{messages, CodecError, DroneId};
use thiserror::Error;

/// Every failure is scoped to the request that triggered it; nothing is retried internally.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Malformed identifier or payload
    #[error("{0}")]
    InvalidRequest(#[from] CodecError),

    /// No queued entry carries this drone ID
    #[error("{}", messages::NO_DRONE_WITH_ID)]
    NotFound(DroneId),

    /// No entry is currently waiting for a task
    #[error("{}", messages::NO_AVAILABLE_DRONES)]
    NoAvailableWorkers,

    /// Response serialization failed
    #[error("{0}")]
    EncodingFailure(#[source] CodecError),

    /// The drone already has an entry in the queue
    #[error("{}", messages::ALREADY_QUEUED)]
    AlreadyQueued(DroneId),

    /// The registration deadline passed before a task was assigned
    #[error("{}", messages::REGISTRATION_TIMED_OUT)]
    RegistrationTimeout(DroneId),

    /// The matched drone's registration went away before the handoff completed
    #[error("{}", messages::WORKER_GONE)]
    WorkerGone(DroneId),

    /// The entry was evicted while its registration was still parked
    #[error("{}", messages::CANCELLED)]
    Cancelled(DroneId),

    #[error("invalid transition for drone {drone_id}: {event:?} from {from}")]
    InvalidTransition {
        drone_id: DroneId,
        from: WorkerStatus,
        event: LifecycleEvent,
    },
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_messages() {
        assert_eq!(
            DispatchError::NotFound(DroneId(1)).to_string(),
            messages::NO_DRONE_WITH_ID
        );
        assert_eq!(
            DispatchError::NoAvailableWorkers.to_string(),
            messages::NO_AVAILABLE_DRONES
        );
        assert_eq!(
            DispatchError::AlreadyQueued(DroneId(1)).to_string(),
            messages::ALREADY_QUEUED
        );
        assert_eq!(
            DispatchError::RegistrationTimeout(DroneId(1)).to_string(),
            messages::REGISTRATION_TIMED_OUT
        );
        assert_eq!(
            DispatchError::WorkerGone(DroneId(1)).to_string(),
            messages::WORKER_GONE
        );
        assert_eq!(
            DispatchError::Cancelled(DroneId(1)).to_string(),
            messages::CANCELLED
        );
    }
}
