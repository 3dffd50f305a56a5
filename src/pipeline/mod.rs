// src/pipeline/mod.rs

//! Change detection and polling orchestration.
//!
//! - `diff`: compare a snapshot with the stored versions
//! - `format`: turn change events into notifications
//! - `monitor`: run one course's fetch → diff → deliver → commit cycle
//! - `scheduler`: sweep all courses on an interval with failure isolation

pub mod diff;
pub mod format;
pub mod monitor;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use diff::{PriorState, detect_changes};
pub use monitor::{CourseMonitor, CycleReport};
pub use scheduler::{CourseFailure, Scheduler, StopSignal, SweepStats};
