//! Waiting Entry State Machine
//!
//! Defines the lifecycle of a drone parked in the dispatch queue:
//!
//! ```text
//! Waiting --Matched--> Assigned --Collected--> (removed)
//! Waiting --Abandoned/Expired--> (removed)
//! Assigned --Abandoned/Expired--> (removed, task lost)
//! ```

use std::fmt;

/// Status of a queued drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerStatus {
    /// Registered and parked, may be matched by a submission
    Waiting,
    /// Matched with a task, no longer eligible for matching
    Assigned,
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Waiting => write!(f, "Waiting"),
            WorkerStatus::Assigned => write!(f, "Assigned"),
        }
    }
}

/// Events that can move an entry through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A submission picked this entry
    Matched,
    /// The drone fetched its task
    Collected,
    /// The registering connection went away
    Abandoned,
    /// A deadline passed before the entry could progress
    Expired,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and the entry stays queued in this state
    Success(WorkerStatus),
    /// Transition was valid and the entry leaves the queue
    Removed {
        /// True when an assigned task is dropped with the entry
        task_lost: bool,
    },
    /// Transition was invalid from current state
    Invalid {
        from: WorkerStatus,
        event: LifecycleEvent,
    },
}

/// Compute the outcome of applying `event` to an entry in `from`
pub fn transition(from: WorkerStatus, event: LifecycleEvent) -> TransitionResult {
    use LifecycleEvent::*;
    use WorkerStatus::*;

    match (from, event) {
        (Waiting, Matched) => TransitionResult::Success(Assigned),
        (Assigned, Collected) => TransitionResult::Removed { task_lost: false },

        // Cancellation drops the entry; an assigned task goes with it
        (Waiting, Abandoned | Expired) => TransitionResult::Removed { task_lost: false },
        (Assigned, Abandoned | Expired) => TransitionResult::Removed { task_lost: true },

        // Matched twice, or collected before a match
        _ => TransitionResult::Invalid { from, event },
    }
}

/// Check if an entry in this status can be handed a task
pub fn is_matchable(status: WorkerStatus) -> bool {
    status == WorkerStatus::Waiting
}
