//! Background Tasks Module
//!
//! Contains background tasks owned by cache drivers.
//!
//! # Tasks
//! - Sweep: Removes expired memory driver entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
