// src/storage/local.rs

//! Local filesystem version store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── descriptions/
//! │   └── {course}.json     # DescriptionRecord
//! └── files/
//!     └── {course}.json     # FileRecord
//! ```
//!
//! Each course owns its own record files, so a crash mid-write or a
//! corrupt file only ever affects that one course.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CourseId;
use crate::storage::{DescriptionRecord, FileRecord, VersionStore};

const DESCRIPTIONS_DIR: &str = "descriptions";
const FILES_DIR: &str = "files";

/// Local filesystem version store.
#[derive(Debug, Clone)]
pub struct LocalVersionStore {
    root_dir: PathBuf,
}

impl LocalVersionStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn record_path(&self, dir: &str, course: &CourseId) -> PathBuf {
        self.root_dir
            .join(dir)
            .join(format!("{}.json", course.storage_key()))
    }

    /// Write bytes atomically (write to temp, sync, rename, sync the directory).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let unavailable = |e| AppError::store_unavailable(path, e);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await.map_err(unavailable)?;
        file.write_all(bytes).await.map_err(unavailable)?;
        file.sync_all().await.map_err(unavailable)?;
        drop(file);

        tokio::fs::rename(&tmp, path).await.map_err(unavailable)?;

        sync_parent_dir(path).await.map_err(unavailable)
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read a record, `None` if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::store_unavailable(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AppError::corrupt_record(path, e))
    }

    async fn read_description(&self, course: &CourseId) -> Result<Option<DescriptionRecord>> {
        let path = self.record_path(DESCRIPTIONS_DIR, course);
        let record: Option<DescriptionRecord> = self.read_json(&path).await?;
        match record {
            Some(r) if &r.course_id != course => Err(Self::foreign_record(&path, &r.course_id)),
            other => Ok(other),
        }
    }

    async fn read_files(&self, course: &CourseId) -> Result<Option<FileRecord>> {
        let path = self.record_path(FILES_DIR, course);
        let record: Option<FileRecord> = self.read_json(&path).await?;
        match record {
            Some(r) if &r.course_id != course => Err(Self::foreign_record(&path, &r.course_id)),
            other => Ok(other),
        }
    }

    fn foreign_record(path: &Path, found: &CourseId) -> AppError {
        AppError::corrupt_record(path, format!("record belongs to course {found}"))
    }

    /// Courses that have at least one record on disk.
    pub async fn known_courses(&self) -> Result<BTreeSet<CourseId>> {
        let mut keys = BTreeSet::new();
        for dir in [DESCRIPTIONS_DIR, FILES_DIR] {
            let path = self.root_dir.join(dir);
            let mut entries = match tokio::fs::read_dir(&path).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(AppError::store_unavailable(&path, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| AppError::store_unavailable(&path, e))?
            {
                let name = entry.file_name();
                if let Some(course) = name
                    .to_str()
                    .and_then(|n| n.strip_suffix(".json"))
                    .and_then(CourseId::from_storage_key)
                {
                    keys.insert(course);
                }
            }
        }
        Ok(keys)
    }
}

/// Flush the directory entry so a completed rename survives a power loss.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => tokio::fs::File::open(parent).await?.sync_all().await,
        None => Ok(()),
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl VersionStore for LocalVersionStore {
    async fn get_description(&self, course: &CourseId) -> Result<Option<String>> {
        Ok(self.read_description(course).await?.map(|r| r.description))
    }

    async fn set_description(&self, course: &CourseId, value: &str) -> Result<()> {
        // Never overwrite a record that belongs to another course.
        self.read_description(course).await?;

        let record = DescriptionRecord {
            course_id: course.clone(),
            description: value.to_string(),
            updated_at: Utc::now(),
        };
        let path = self.record_path(DESCRIPTIONS_DIR, course);
        self.write_json(&path, &record).await
    }

    async fn get_file_ids(&self, course: &CourseId) -> Result<BTreeSet<String>> {
        Ok(self
            .read_files(course)
            .await?
            .map(|r| r.file_ids)
            .unwrap_or_default())
    }

    async fn add_file_id(&self, course: &CourseId, id: &str) -> Result<()> {
        let mut record = self.read_files(course).await?.unwrap_or_else(|| FileRecord {
            course_id: course.clone(),
            file_ids: BTreeSet::new(),
            updated_at: Utc::now(),
        });

        if record.file_ids.contains(id) {
            return Ok(());
        }
        record.file_ids.insert(id.to_string());
        record.updated_at = Utc::now();

        let path = self.record_path(FILES_DIR, course);
        self.write_json(&path, &record).await
    }
}
