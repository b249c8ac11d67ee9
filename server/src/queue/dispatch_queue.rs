//! Ordered storage of parked drones

use super::entry::WaitingEntry;
use crate::error::{DispatchError, Result};
use dispatch_shared::state_machine::{self, WorkerStatus};
use dispatch_shared::DroneId;
use std::time::{Duration, Instant};

/// Insertion-ordered queue of waiting entries
///
/// Not synchronized on its own; the dispatcher owns it behind a single mutex and never holds
/// that lock across an await. Scans are linear, which is fine for fleets of tens of drones.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    entries: Vec<WaitingEntry>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the tail
    pub fn enqueue(&mut self, entry: WaitingEntry) {
        self.entries.push(entry);
    }

    /// Remove and return the entry for `drone_id`, keeping the order of the rest
    pub fn pop_by_id(&mut self, drone_id: DroneId) -> Result<WaitingEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.drone_id() == drone_id)
            .ok_or(DispatchError::NotFound(drone_id))?;
        Ok(self.entries.remove(index))
    }

    /// First `Waiting` entry in insertion order, left in place
    ///
    /// The caller must assign it before releasing the queue lock.
    pub fn first_waiting_mut(&mut self) -> Result<&mut WaitingEntry> {
        self.entries
            .iter_mut()
            .find(|e| state_machine::is_matchable(e.status()))
            .ok_or(DispatchError::NoAvailableWorkers)
    }

    /// The entry for `drone_id`, provided it is still `Waiting`
    pub fn waiting_by_id_mut(&mut self, drone_id: DroneId) -> Result<&mut WaitingEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.drone_id() == drone_id && state_machine::is_matchable(e.status()))
            .ok_or(DispatchError::NotFound(drone_id))
    }

    /// Remove the entry created under `ticket`, but only while it is still `Waiting`
    ///
    /// An entry that was assigned in the meantime stays queued for its drone to collect.
    pub fn remove_waiting_ticket(&mut self, ticket: u64) -> Option<WaitingEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.ticket() == ticket && state_machine::is_matchable(e.status()))?;
        Some(self.entries.remove(index))
    }

    /// Remove the entry created under `ticket`, if it is still queued
    pub fn remove_ticket(&mut self, ticket: u64) -> Option<WaitingEntry> {
        let index = self.entries.iter().position(|e| e.ticket() == ticket)?;
        Some(self.entries.remove(index))
    }

    /// Remove `Assigned` entries whose drone has not collected within `max_age`
    pub fn drain_uncollected(&mut self, max_age: Duration, now: Instant) -> Vec<WaitingEntry> {
        let mut evicted = Vec::new();
        if self.is_empty() {
            return evicted;
        }

        let mut i = 0;
        while i < self.entries.len() {
            let stale = self.entries[i]
                .assigned_at()
                .is_some_and(|at| now.saturating_duration_since(at) > max_age);
            if stale {
                evicted.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        evicted
    }

    pub fn status_of(&self, drone_id: DroneId) -> Option<WorkerStatus> {
        self.entries
            .iter()
            .find(|e| e.drone_id() == drone_id)
            .map(WaitingEntry::status)
    }

    pub fn contains(&self, drone_id: DroneId) -> bool {
        self.status_of(drone_id).is_some()
    }

    /// Drone IDs in queue order
    #[cfg(test)]
    pub fn drone_ids(&self) -> Vec<DroneId> {
        self.entries.iter().map(WaitingEntry::drone_id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
