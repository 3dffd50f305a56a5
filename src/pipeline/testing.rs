// src/pipeline/testing.rs

//! In-memory collaborators for monitor and scheduler tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::{Course, CourseId, CourseSnapshot, FileEntry, Notification};
use crate::pipeline::monitor::CourseMonitor;
use crate::services::{CourseExtractor, CoursePage, CoursePortal, Enricher, Notifier, PassThrough};
use crate::storage::{LocalVersionStore, VersionStore};

pub fn course(code: &str, name: &str) -> Course {
    Course {
        code: CourseId::new(code),
        name: name.to_string(),
        id: 1,
        season_id: 1,
    }
}

pub fn file(id: &str, name: &str) -> FileEntry {
    FileEntry {
        id: id.to_string(),
        display_name: name.to_string(),
        category: "Lecture slides".to_string(),
    }
}

#[derive(Default)]
pub struct FakePortal {
    courses: Mutex<Vec<Course>>,
    failing: Mutex<HashSet<CourseId>>,
    hanging: Mutex<HashSet<CourseId>>,
    discovery_fails: AtomicBool,
    fetches: AtomicUsize,
}

impl FakePortal {
    pub fn set_courses(&self, courses: Vec<Course>) {
        *self.courses.lock().unwrap() = courses;
    }

    pub fn fail_fetch(&self, course: &Course) {
        self.failing.lock().unwrap().insert(course.code.clone());
    }

    /// Fetches of `course` never complete.
    pub fn hang_fetch(&self, course: &Course) {
        self.hanging.lock().unwrap().insert(course.code.clone());
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.discovery_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoursePortal for FakePortal {
    async fn discover_courses(&self) -> Result<Vec<Course>> {
        if self.discovery_fails.load(Ordering::SeqCst) {
            return Err(AppError::discovery("course list unavailable"));
        }
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn fetch_course_page(&self, course: &Course) -> Result<CoursePage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hanging.lock().unwrap().contains(&course.code) {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&course.code) {
            return Err(AppError::fetch(course.code.as_str(), "connection reset"));
        }
        Ok(CoursePage {
            url: format!("https://cms.test/{}", course.code),
            html: String::new(),
        })
    }
}

/// Serves preset snapshots keyed by course code.
#[derive(Default)]
pub struct FakeExtractor {
    pages: Mutex<HashMap<CourseId, (String, Vec<FileEntry>)>>,
}

impl FakeExtractor {
    pub fn set(&self, course: &Course, description: &str, files: Vec<FileEntry>) {
        self.pages
            .lock()
            .unwrap()
            .insert(course.code.clone(), (description.to_string(), files));
    }
}

impl CourseExtractor for FakeExtractor {
    fn extract(&self, course: &Course, _page: &CoursePage) -> Result<CourseSnapshot> {
        let pages = self.pages.lock().unwrap();
        let (description, files) = pages
            .get(&course.code)
            .cloned()
            .ok_or_else(|| AppError::extraction(course.code.as_str(), "unexpected layout"))?;
        Ok(CourseSnapshot {
            course_id: course.code.clone(),
            course_name: course.name.clone(),
            description,
            files,
        })
    }
}

/// Records delivered titles; fails any title containing the armed pattern.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail_pattern: Mutex<Option<String>>,
    hang: AtomicBool,
    stop_trigger: Mutex<Option<(String, watch::Sender<bool>)>>,
}

impl RecordingNotifier {
    pub fn fail_on(&self, pattern: &str) {
        *self.fail_pattern.lock().unwrap() = Some(pattern.to_string());
    }

    /// Deliveries never complete until `recover`.
    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        *self.fail_pattern.lock().unwrap() = None;
        self.hang.store(false, Ordering::SeqCst);
    }

    /// Request a stop while delivering a title containing `pattern`.
    pub fn stop_on(&self, pattern: &str, stop: watch::Sender<bool>) {
        *self.stop_trigger.lock().unwrap() = Some((pattern.to_string(), stop));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some((pattern, stop)) = self.stop_trigger.lock().unwrap().as_ref() {
            if notification.title.contains(pattern.as_str()) {
                stop.send(true).unwrap();
            }
        }
        // Yield so concurrent cycles interleave at delivery.
        tokio::task::yield_now().await;

        if let Some(pattern) = self.fail_pattern.lock().unwrap().as_deref() {
            if notification.title.contains(pattern) {
                return Err(AppError::delivery("push endpoint returned 503"));
            }
        }
        self.sent.lock().unwrap().push(notification.title.clone());
        Ok(())
    }
}

pub struct FailingEnricher;

#[async_trait]
impl Enricher for FailingEnricher {
    async fn enrich(&self, _text: &str) -> Result<String> {
        Err(AppError::enrichment("model overloaded"))
    }
}

/// Words its output differently on every call.
#[derive(Default)]
pub struct DriftingEnricher {
    calls: AtomicUsize,
}

#[async_trait]
impl Enricher for DriftingEnricher {
    async fn enrich(&self, text: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{text} (summary v{n})"))
    }
}

/// A monitor wired to fakes and a temporary on-disk store.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<LocalVersionStore>,
    pub portal: Arc<FakePortal>,
    pub extractor: Arc<FakeExtractor>,
    pub notifier: Arc<RecordingNotifier>,
    pub monitor: Arc<CourseMonitor>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_enricher(Arc::new(PassThrough))
    }

    pub fn with_failing_enricher() -> Self {
        Self::with_enricher(Arc::new(FailingEnricher))
    }

    pub fn with_enricher(enricher: Arc<dyn Enricher>) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        Self::build(dir, root, enricher)
    }

    /// Store rooted at a regular file, so every store call fails.
    pub fn with_unavailable_store() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"").unwrap();
        Self::build(dir, root, Arc::new(PassThrough))
    }

    fn build(dir: TempDir, root: PathBuf, enricher: Arc<dyn Enricher>) -> Self {
        let store = Arc::new(LocalVersionStore::new(root));
        let portal = Arc::new(FakePortal::default());
        let extractor = Arc::new(FakeExtractor::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let monitor = Arc::new(CourseMonitor::new(
            portal.clone(),
            extractor.clone(),
            enricher,
            notifier.clone(),
            store.clone(),
            Duration::from_secs(5),
        ));

        Self {
            dir,
            store,
            portal,
            extractor,
            notifier,
            monitor,
        }
    }

    /// Pre-populate a course's version records.
    pub async fn seed(&self, course: &Course, description: Option<&str>, ids: &[&str]) {
        if let Some(description) = description {
            self.store
                .set_description(&course.code, description)
                .await
                .unwrap();
        }
        for id in ids {
            self.store.add_file_id(&course.code, id).await.unwrap();
        }
    }

    /// Stored (description, sorted file ids) for a course.
    pub async fn state(&self, course: &Course) -> (Option<String>, Vec<String>) {
        (
            self.store.get_description(&course.code).await.unwrap(),
            self.store
                .get_file_ids(&course.code)
                .await
                .unwrap()
                .into_iter()
                .collect(),
        )
    }

    pub fn corrupt_files_record(&self, course: &Course) {
        let dir = self.store.root().join("files");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.json", course.code.storage_key())),
            b"[truncated",
        )
        .unwrap();
    }
}
