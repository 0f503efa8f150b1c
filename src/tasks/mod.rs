//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache prune: removes expired entries from both cache tiers

mod cleanup;

pub use cleanup::spawn_prune_task;
