// src/services/mod.rs

//! Service layer for the notifier.
//!
//! This module contains the collaborators the monitor talks to:
//! - Course discovery and page retrieval (`CoursePortal`)
//! - Page parsing (`CourseExtractor`)
//! - Optional description enrichment (`Enricher`)
//! - Notification delivery (`Notifier`)

pub mod enrich;
pub mod extract;
pub mod notify;
pub mod portal;

pub use enrich::{ChatEnricher, Enricher, PassThrough};
pub use extract::{CourseExtractor, HtmlExtractor};
pub use notify::{HttpNotifier, LogNotifier, Notifier};
pub use portal::{CoursePage, CoursePortal, HttpPortal};
