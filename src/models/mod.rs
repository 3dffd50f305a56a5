// src/models/mod.rs

//! Domain models for the notifier.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod change;
mod config;
mod course;

// Re-export all public types
pub use change::{ChangeEvent, Notification};
pub use config::{
    Config, EnrichmentConfig, ExtractConfig, MonitorConfig, NotificationConfig, PortalConfig,
};
pub use course::{Course, CourseId, CourseSnapshot, FileEntry};
