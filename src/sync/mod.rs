//! Synchronization seam to the task scheduler
//!
//! The driver never blocks on its own. Every suspension goes through a
//! [`TransmitLock`], which the scheduler port supplies.
//!
//! # Design
//! - `TransmitLock` mirrors a scheduler mutex: create / get with timeout / put
//! - `WaitPolicy` replaces the scheduler's magic timeout integers
//! - `TransmitGuard` releases on drop, so no path can leak the lock

pub mod lock;

pub use lock::{LockError, SpinTransmitLock, TransmitGuard, TransmitLock, WaitPolicy};
