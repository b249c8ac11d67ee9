//! Dispatcher pairing submitted tasks with parked drones

use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::queue::{DispatchQueue, WaitingEntry};
use dispatch_shared::state_machine::{self, LifecycleEvent, TransitionResult, WorkerStatus};
use dispatch_shared::{DroneId, TaskPayload};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

type SharedQueue = Arc<Mutex<DispatchQueue>>;

/// Which drone a submission may be handed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The longest-waiting drone
    Any,
    /// Only this drone, and only while it is waiting
    Drone(DroneId),
}

impl From<Option<DroneId>> for Target {
    fn from(drone_id: Option<DroneId>) -> Self {
        drone_id.map_or(Target::Any, Target::Drone)
    }
}

/// Process-wide coordinator between registering drones and submitting pilots
///
/// All queue mutation happens under one mutex. Channel sends and waits happen after the
/// lock is released, so a slow or absent reader never stalls other queue operations.
pub struct Dispatcher {
    queue: SharedQueue,
    ticket: AtomicU64,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher owning `queue`
    pub fn new(queue: DispatchQueue, config: DispatchConfig) -> Self {
        Self {
            queue: Arc::new(Mutex::new(queue)),
            ticket: AtomicU64::new(0),
            config,
        }
    }

    fn next_ticket(&self) -> u64 {
        self.ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock(&self) -> MutexGuard<'_, DispatchQueue> {
        lock_queue(&self.queue)
    }

    /// Park a drone until a task is assigned to it
    ///
    /// Returns the ID the drone uses to collect its task. If the returned future is dropped
    /// before release (the connection closed), the entry is removed from the queue.
    pub async fn register(&self, drone_id: DroneId) -> Result<DroneId> {
        let ticket = self.next_ticket();
        let (entry, mut released) = WaitingEntry::new(ticket, drone_id);

        {
            let mut queue = self.lock();
            if queue.contains(drone_id) {
                return Err(DispatchError::AlreadyQueued(drone_id));
            }
            queue.enqueue(entry);
            debug!(%drone_id, ticket, queue_len = queue.len(), "Entry enqueued");
        }

        let mut guard = RegistrationGuard::new(self.queue.clone(), ticket, drone_id);
        info!(%drone_id, "Drone registered, waiting for task");

        let outcome = match self.config.register_timeout {
            Some(deadline) => match timeout(deadline, &mut released).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    if guard.expire() {
                        warn!(%drone_id, ?deadline, "Registration timed out");
                        return Err(DispatchError::RegistrationTimeout(drone_id));
                    }
                    // Assigned before the deadline took the lock; the release follows the handoff
                    (&mut released).await
                }
            },
            None => (&mut released).await,
        };

        match outcome {
            Ok(()) => {
                guard.disarm();
                info!(%drone_id, "Drone released to collect its task");
                Ok(drone_id)
            }
            Err(_) => {
                drop(guard);
                Err(DispatchError::Cancelled(drone_id))
            }
        }
    }

    /// Hand `payload` to exactly one waiting drone
    ///
    /// Returns once the task is handed over, not when the drone has finished it.
    pub fn submit(&self, target: Target, payload: TaskPayload) -> Result<DroneId> {
        let handoff = {
            let mut queue = self.lock();
            let entry = match target {
                Target::Any => queue.first_waiting_mut()?,
                Target::Drone(drone_id) => queue.waiting_by_id_mut(drone_id)?,
            };
            entry.assign(payload.item_id)?
        };

        let drone_id = handoff.drone_id();
        let item_id = payload.item_id;
        match handoff.deliver(payload) {
            Ok(drone_id) => {
                info!(%drone_id, item_id, "Task handed to drone");
                Ok(drone_id)
            }
            Err(e) => {
                warn!(%drone_id, item_id, "Drone went away before handoff");
                Err(e)
            }
        }
    }

    /// Remove a released drone's entry and return the task delivered to it
    ///
    /// Entries still `Waiting` are left alone and reported as not found.
    pub async fn collect(&self, drone_id: DroneId) -> Result<TaskPayload> {
        let entry = {
            let mut queue = self.lock();
            match queue.status_of(drone_id) {
                Some(WorkerStatus::Assigned) => queue.pop_by_id(drone_id)?,
                _ => return Err(DispatchError::NotFound(drone_id)),
            }
        };

        let delivery = entry.into_delivery()?;
        let payload = delivery
            .await
            .map_err(|_| DispatchError::NotFound(drone_id))?;

        debug!(%drone_id, item_id = payload.item_id, "Task collected");
        Ok(payload)
    }

    /// Evict assigned entries whose drone never collected its task
    pub fn evict_uncollected(&self) -> Vec<DroneId> {
        let evicted = self
            .lock()
            .drain_uncollected(self.config.collect_timeout, Instant::now());

        for entry in &evicted {
            warn!(
                drone_id = %entry.drone_id(),
                item_id = ?entry.item_id(),
                "Task never collected, entry evicted"
            );
        }

        evicted.iter().map(WaitingEntry::drone_id).collect()
    }

    /// Get the number of queued entries
    pub fn queue_len(&self) -> usize {
        self.lock().len()
    }

    /// Get the status of a drone's entry, if it is queued
    #[cfg(test)]
    pub fn status_of(&self, drone_id: DroneId) -> Option<WorkerStatus> {
        self.lock().status_of(drone_id)
    }

    /// Get queued drone IDs in FIFO order
    #[cfg(test)]
    pub fn queued_drones(&self) -> Vec<DroneId> {
        self.lock().drone_ids()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchQueue::new(), DispatchConfig::default())
    }
}

fn lock_queue(queue: &Mutex<DispatchQueue>) -> MutexGuard<'_, DispatchQueue> {
    // Critical sections never panic mid-mutation, so a poisoned queue is still consistent
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a registration's entry unless the registration completed
struct RegistrationGuard {
    queue: SharedQueue,
    ticket: u64,
    drone_id: DroneId,
    event: Option<LifecycleEvent>,
}

impl RegistrationGuard {
    fn new(queue: SharedQueue, ticket: u64, drone_id: DroneId) -> Self {
        Self {
            queue,
            ticket,
            drone_id,
            event: Some(LifecycleEvent::Abandoned),
        }
    }

    fn disarm(mut self) {
        self.event = None;
    }

    /// Remove the entry if no task was assigned to it yet
    ///
    /// Returns `false` when a submission won the race for the lock. The guard then stays
    /// armed, since the registration still has to wait for its release.
    fn expire(&mut self) -> bool {
        let Some(entry) = lock_queue(&self.queue).remove_waiting_ticket(self.ticket) else {
            return false;
        };
        self.event = None;
        self.report(&entry, LifecycleEvent::Expired);
        true
    }

    fn report(&self, entry: &WaitingEntry, event: LifecycleEvent) {
        match state_machine::transition(entry.status(), event) {
            TransitionResult::Removed { task_lost: true } => {
                warn!(
                    drone_id = %self.drone_id,
                    item_id = ?entry.item_id(),
                    ?event,
                    "Drone left after assignment, task dropped"
                );
            }
            _ => {
                info!(
                    drone_id = %self.drone_id,
                    ?event,
                    waited_ms = entry.enqueued_at().elapsed().as_millis() as u64,
                    "Registration ended, entry removed"
                );
            }
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let Some(event) = self.event else {
            return;
        };

        let Some(entry) = lock_queue(&self.queue).remove_ticket(self.ticket) else {
            return;
        };
        self.report(&entry, event);
    }
}
