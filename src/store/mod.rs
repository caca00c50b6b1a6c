//! In-memory storage module
//!
//! Provides the core data structures for storing key-value pairs in memory.
//! This module is independent of protocol and command handling (loose coupling).

mod entry;
mod value;
mod memory;
mod expiry;

pub use entry::Entry;
pub use value::Value;
pub use memory::{
    MemoryStore, SweepStats, SWEEP_EXPIRED_THRESHOLD, SWEEP_SAMPLE_SIZE, SWEEP_TIME_BUDGET,
};
pub use expiry::spawn_sweeper;
