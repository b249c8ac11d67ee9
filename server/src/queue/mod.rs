//! Dispatch queue for tracking parked drones
//!
//! This module handles:
//! - Per-drone waiting entries and their one-shot handoff channels
//! - FIFO and ID-based lookup of entries
//! - Eviction of entries whose drone never came back for its task

mod dispatch_queue;
mod entry;

pub use dispatch_queue::DispatchQueue;
pub use entry::WaitingEntry;
