//! Task dispatch between drones and pilots
//!
//! This module handles:
//! - Parking registering drones until a task is assigned
//! - Matching submissions to drones (FIFO or by drone ID)
//! - Removing entries whose registration was cancelled or timed out
//! - Evicting tasks that were assigned but never collected

mod dispatcher;
mod timeout;

pub use dispatcher::{Dispatcher, Target};
pub use timeout::CollectionReaper;
