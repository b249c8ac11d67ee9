//! A single drone parked in the dispatch queue

use crate::error::{DispatchError, Result};
use dispatch_shared::state_machine::{self, LifecycleEvent, TransitionResult, WorkerStatus};
use dispatch_shared::{DroneId, TaskPayload};
use std::time::Instant;
use tokio::sync::oneshot;

/// Queue record for one registered drone
///
/// Holds both halves of the delivery channel: the sender is taken by the submission that
/// matches the entry, the receiver by the drone's own `GET /actions`. The `released` sender
/// fires once to let the parked registration answer with its redirect.
#[derive(Debug)]
pub struct WaitingEntry {
    ticket: u64,
    drone_id: DroneId,
    status: WorkerStatus,
    enqueued_at: Instant,
    assigned_at: Option<Instant>,
    item_id: Option<i64>,
    delivery_tx: Option<oneshot::Sender<TaskPayload>>,
    delivery_rx: Option<oneshot::Receiver<TaskPayload>>,
    released_tx: Option<oneshot::Sender<()>>,
}

impl WaitingEntry {
    /// Create an entry in `Waiting` state, returning the release signal the registration parks on
    pub fn new(ticket: u64, drone_id: DroneId) -> (Self, oneshot::Receiver<()>) {
        let (delivery_tx, delivery_rx) = oneshot::channel();
        let (released_tx, released_rx) = oneshot::channel();

        let entry = Self {
            ticket,
            drone_id,
            status: WorkerStatus::Waiting,
            enqueued_at: Instant::now(),
            assigned_at: None,
            item_id: None,
            delivery_tx: Some(delivery_tx),
            delivery_rx: Some(delivery_rx),
            released_tx: Some(released_tx),
        };

        (entry, released_rx)
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn drone_id(&self) -> DroneId {
        self.drone_id
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// When the entry was matched, if it has been
    pub fn assigned_at(&self) -> Option<Instant> {
        self.assigned_at
    }

    /// Item ID of the assigned task, if any
    pub fn item_id(&self) -> Option<i64> {
        self.item_id
    }

    /// Mark the entry `Assigned` and take the senders needed for the handoff
    ///
    /// Must be called under the queue lock. The senders leave the entry here, so a second
    /// match cannot deliver to it even if the status check were bypassed.
    pub fn assign(&mut self, item_id: i64) -> Result<Handoff> {
        let next = match state_machine::transition(self.status, LifecycleEvent::Matched) {
            TransitionResult::Success(status) => status,
            _ => return Err(self.invalid(LifecycleEvent::Matched)),
        };

        let (Some(delivery), Some(released)) = (self.delivery_tx.take(), self.released_tx.take())
        else {
            return Err(self.invalid(LifecycleEvent::Matched));
        };

        self.status = next;
        self.assigned_at = Some(Instant::now());
        self.item_id = Some(item_id);

        Ok(Handoff {
            drone_id: self.drone_id,
            delivery,
            released,
        })
    }

    /// Consume a collected entry, yielding the channel its task was delivered on
    pub fn into_delivery(mut self) -> Result<oneshot::Receiver<TaskPayload>> {
        match state_machine::transition(self.status, LifecycleEvent::Collected) {
            TransitionResult::Removed { .. } => {}
            _ => return Err(self.invalid(LifecycleEvent::Collected)),
        }
        self.delivery_rx
            .take()
            .ok_or(DispatchError::NotFound(self.drone_id))
    }

    fn invalid(&self, event: LifecycleEvent) -> DispatchError {
        DispatchError::InvalidTransition {
            drone_id: self.drone_id,
            from: self.status,
            event,
        }
    }
}

/// Senders taken from a matched entry, used outside the queue lock
#[derive(Debug)]
pub struct Handoff {
    drone_id: DroneId,
    delivery: oneshot::Sender<TaskPayload>,
    released: oneshot::Sender<()>,
}

impl Handoff {
    pub fn drone_id(&self) -> DroneId {
        self.drone_id
    }

    /// Deliver the payload, then release the parked registration
    ///
    /// Neither send blocks: both channels are single-slot and written exactly once.
    pub fn deliver(self, payload: TaskPayload) -> Result<DroneId> {
        self.delivery
            .send(payload)
            .map_err(|_| DispatchError::WorkerGone(self.drone_id))?;
        self.released
            .send(())
            .map_err(|_| DispatchError::WorkerGone(self.drone_id))?;
        Ok(self.drone_id)
    }
}
