// src/pipeline/monitor.rs

//! Per-course monitoring cycle.
//!
//! One cycle: fetch → extract → load prior state → diff → for each event
//! in order: enrich (description text only), format, deliver, and commit
//! only once the delivery went through. A failed delivery stops the cycle
//! so nothing after it is committed; the next sweep sees the same changes
//! again.
//!
//! The diff and the store only ever see the extracted text. Enrichment
//! output goes into the notification and nowhere else, so a model that
//! words the same page differently on each call never re-triggers a
//! change.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use crate::config::Secrets;
use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, Config, Course, CourseId, CourseSnapshot, Notification};
use crate::pipeline::diff::{PriorState, detect_changes};
use crate::pipeline::format;
use crate::services::{
    ChatEnricher, CourseExtractor, CoursePortal, Enricher, HtmlExtractor, HttpNotifier,
    HttpPortal, LogNotifier, Notifier, PassThrough,
};
use crate::storage::VersionStore;

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub course: CourseId,
    /// Events produced by the diff
    pub detected: usize,
    /// Events delivered and committed
    pub delivered: usize,
    /// Delivery error that stopped the cycle early
    pub halted: Option<String>,
}

impl CycleReport {
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Events left for the next sweep.
    pub fn pending(&self) -> usize {
        self.detected - self.delivered
    }
}

/// Per-course async locks; distinct courses never contend.
#[derive(Default)]
struct CourseLocks {
    inner: Mutex<HashMap<CourseId, Arc<tokio::sync::Mutex<()>>>>,
}

impl CourseLocks {
    async fn acquire(&self, course: &CourseId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(map.entry(course.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Runs monitoring cycles for individual courses.
pub struct CourseMonitor {
    portal: Arc<dyn CoursePortal>,
    extractor: Arc<dyn CourseExtractor>,
    enricher: Arc<dyn Enricher>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn VersionStore>,
    step_timeout: Duration,
    locks: CourseLocks,
}

impl CourseMonitor {
    pub fn new(
        portal: Arc<dyn CoursePortal>,
        extractor: Arc<dyn CourseExtractor>,
        enricher: Arc<dyn Enricher>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn VersionStore>,
        step_timeout: Duration,
    ) -> Self {
        Self {
            portal,
            extractor,
            enricher,
            notifier,
            store,
            step_timeout,
            locks: CourseLocks::default(),
        }
    }

    /// Wire the HTTP collaborators selected by `config`.
    pub fn from_config(
        config: &Config,
        secrets: &Secrets,
        store: Arc<dyn VersionStore>,
    ) -> Result<Self> {
        let step_timeout = config.monitor.step_timeout();

        let portal = HttpPortal::new(&config.portal, secrets.portal.clone())?;
        let extractor = HtmlExtractor::new(&config.extract)?;

        let enricher: Arc<dyn Enricher> = match &secrets.enrichment_api_key {
            Some(key) if config.enrichment.enabled => Arc::new(ChatEnricher::new(
                &config.enrichment,
                key.clone(),
                step_timeout,
            )?),
            _ => Arc::new(PassThrough),
        };

        let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
            let key = secrets.notifications_api_key.clone().ok_or_else(|| {
                AppError::config(format!(
                    "{} is required when notifications are enabled",
                    config.notifications.api_key_env
                ))
            })?;
            Arc::new(HttpNotifier::new(&config.notifications, key, step_timeout)?)
        } else {
            log::warn!("Notifications are disabled; changes will only be logged");
            Arc::new(LogNotifier)
        };

        Ok(Self::new(
            Arc::new(portal),
            Arc::new(extractor),
            enricher,
            notifier,
            store,
            step_timeout,
        ))
    }

    /// Current course list from the portal.
    pub async fn discover(&self) -> Result<Vec<Course>> {
        self.bounded("discovery", self.portal.discover_courses())
            .await
    }

    /// Run one full cycle for `course`.
    pub async fn run_cycle(&self, course: &Course) -> Result<CycleReport> {
        let snapshot = self.observe(course).await?;

        // Read-modify-write of this course's records is serialized.
        let _guard = self.locks.acquire(&course.code).await;

        let prior = PriorState {
            description: self.store.get_description(&course.code).await?,
            file_ids: self.store.get_file_ids(&course.code).await?,
        };

        let events = detect_changes(&snapshot, &prior);
        let mut report = CycleReport {
            course: course.code.clone(),
            detected: events.len(),
            delivered: 0,
            halted: None,
        };

        if events.is_empty() {
            log::debug!("No changes for {}", course.label());
            return Ok(report);
        }
        log::info!("{} change(s) detected for {}", events.len(), course.label());

        for event in &events {
            let notification = self.render(course, event).await;

            if let Err(e) = self.bounded("delivery", self.notifier.deliver(&notification)).await {
                log::warn!(
                    "Delivery failed for {} ({} pending, retrying next sweep): {}",
                    course.label(),
                    events.len() - report.delivered,
                    e
                );
                report.halted = Some(e.to_string());
                break;
            }

            self.commit(event).await.inspect_err(|e| {
                log::error!(
                    "Delivered but could not record change for {}: {}",
                    course.label(),
                    e
                );
            })?;
            report.delivered += 1;
            log::info!("Sent: {}", notification.title);
        }

        Ok(report)
    }

    /// Fetch and extract; nothing is written here.
    async fn observe(&self, course: &Course) -> Result<CourseSnapshot> {
        let page = self
            .bounded("fetch", self.portal.fetch_course_page(course))
            .await
            .map_err(|e| match e {
                AppError::Fetch { .. } | AppError::Timeout { .. } => e,
                other => AppError::fetch(course.code.as_str(), other),
            })?;

        self.extractor.extract(course, &page).map_err(|e| match e {
            AppError::Extraction { .. } => e,
            other => AppError::extraction(course.code.as_str(), other),
        })
    }

    /// Notification for `event`, with the description passed through the
    /// enricher. The event itself is left untouched for the commit.
    async fn render(&self, course: &Course, event: &ChangeEvent) -> Notification {
        match event {
            ChangeEvent::DescriptionChanged {
                course_id,
                course_name,
                new_description,
            } => format::notification(&ChangeEvent::DescriptionChanged {
                course_id: course_id.clone(),
                course_name: course_name.clone(),
                new_description: self.enrich(course, new_description).await,
            }),
            ChangeEvent::NewFile { .. } => format::notification(event),
        }
    }

    /// Best-effort enrichment; any failure yields `text` unchanged.
    async fn enrich(&self, course: &Course, text: &str) -> String {
        match self.bounded("enrichment", self.enricher.enrich(text)).await {
            Ok(enriched) if !enriched.trim().is_empty() => enriched,
            Ok(_) => {
                log::warn!(
                    "Enrichment returned nothing for {}, using extracted text",
                    course.label()
                );
                text.to_string()
            }
            Err(e) => {
                log::warn!(
                    "Enrichment failed for {}, using extracted text: {}",
                    course.label(),
                    e
                );
                text.to_string()
            }
        }
    }

    /// Record a delivered event in the version store.
    async fn commit(&self, event: &ChangeEvent) -> Result<()> {
        match event {
            ChangeEvent::DescriptionChanged {
                course_id,
                new_description,
                ..
            } => self.store.set_description(course_id, new_description).await,
            ChangeEvent::NewFile {
                course_id, file, ..
            } => self.store.add_file_id(course_id, &file.id).await,
        }
    }

    async fn bounded<T>(
        &self,
        step: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.step_timeout, fut)
            .await
            .map_err(|_| AppError::timeout(step, self.step_timeout.as_secs()))?
    }
}
