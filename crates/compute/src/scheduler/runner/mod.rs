//! Core budget scheduler -- admits jobs against the core budget and runs them
//! on a worker pool.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructors, and accessor methods
//! - `scheduling`: Eager validation and admission order
//! - `execution`: Dispatch loop and result collection

mod core;
mod execution;
mod scheduling;

pub use self::core::Scheduler;
