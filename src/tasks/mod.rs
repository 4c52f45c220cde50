//! Background Tasks Module
//!
//! Contains the background worker that owns all disk mutations.
//!
//! # Tasks
//! - Disk write queue: applies writes, removals and clears in FIFO order

mod write_queue;

pub use write_queue::{DiskTask, WriteQueue};
