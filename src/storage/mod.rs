// src/storage/mod.rs

//! Version store abstractions.
//!
//! Two independent record kinds are kept per course:
//! - Description: the last delivered description text
//! - Files: the set of file ids already notified
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml
//! ├── descriptions/
//! │   ├── MATH301.json
//! │   └── CSEN_20701.json
//! └── files/
//!     ├── MATH301.json
//!     └── CSEN_20701.json
//! ```

pub mod local;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::CourseId;

// Re-export for convenience
pub use local::LocalVersionStore;

/// Persisted description version for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    pub course_id: CourseId,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

/// Persisted set of known file ids for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub course_id: CourseId,
    pub file_ids: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

/// Durable last-known state per course.
///
/// Implementations must persist before returning from a write, must report
/// an unreachable medium as an error rather than as absent state, and must
/// keep one course's record independent of every other course's.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Last delivered description, `None` if the course has no record.
    async fn get_description(&self, course: &CourseId) -> Result<Option<String>>;

    /// Overwrite the description record.
    async fn set_description(&self, course: &CourseId, value: &str) -> Result<()>;

    /// Known file ids, empty if the course has no record.
    async fn get_file_ids(&self, course: &CourseId) -> Result<BTreeSet<String>>;

    /// Record a file id. Idempotent.
    async fn add_file_id(&self, course: &CourseId, id: &str) -> Result<()>;
}
