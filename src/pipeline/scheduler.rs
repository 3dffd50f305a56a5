// src/pipeline/scheduler.rs

//! Sweep scheduler.
//!
//! `Idle → Sweeping → Idle`, forever, until a stop is requested. A sweep
//! rediscovers the course list and runs one cycle per course; a failing
//! course is logged and counted, never fatal to the sweep. The next sweep
//! starts only after the previous one has fully completed and the
//! interval has elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::models::{Course, CourseId};
use crate::pipeline::monitor::CourseMonitor;

/// Stop flag shared between the scheduler and whoever may stop it.
pub type StopSignal = watch::Receiver<bool>;

/// A course whose cycle ended in an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseFailure {
    pub course: CourseId,
    pub kind: &'static str,
    pub message: String,
}

/// Statistics for one sweep.
#[derive(Debug, Clone)]
pub struct SweepStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub discovered: usize,
    pub succeeded: usize,
    /// Courses not started because a stop was requested
    pub skipped: usize,
    /// Cycles stopped early by a delivery failure
    pub halted: usize,
    pub notifications: usize,
    pub failures: Vec<CourseFailure>,
    /// Set when the course list itself could not be fetched
    pub discovery_error: Option<String>,
}

impl SweepStats {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            discovered: 0,
            succeeded: 0,
            skipped: 0,
            halted: 0,
            notifications: 0,
            failures: Vec::new(),
            discovery_error: None,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Drives sweeps over all courses on a fixed interval.
pub struct Scheduler {
    monitor: Arc<CourseMonitor>,
    interval: Duration,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(monitor: Arc<CourseMonitor>, interval: Duration, max_concurrent: usize) -> Self {
        Self {
            monitor,
            interval,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Sweep until `stop` turns true.
    ///
    /// The flag is checked before every sweep and before every course;
    /// cycles already running always finish.
    pub async fn run(&self, mut stop: StopSignal) {
        let mut sweep_no: u64 = 0;
        loop {
            if *stop.borrow() {
                break;
            }

            sweep_no += 1;
            log::info!("Sweep #{} starting", sweep_no);
            let stats = self.sweep(&stop).await;
            log_summary(sweep_no, &stats);

            if *stop.borrow() {
                break;
            }

            log::info!("Sleeping for {}s", self.interval.as_secs());
            self.idle(&mut stop).await;
        }
        log::info!("Scheduler stopped after {} sweep(s)", sweep_no);
    }

    /// Wait out the interval, returning early only for a real stop.
    async fn idle(&self, stop: &mut StopSignal) {
        let wake = Instant::now() + self.interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => return,
                changed = stop.changed() => {
                    if changed.is_err() {
                        // Nobody can signal a stop any more; keep the cadence.
                        tokio::time::sleep_until(wake).await;
                        return;
                    }
                    if *stop.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// One sweep over the currently discovered courses.
    pub async fn sweep(&self, stop: &StopSignal) -> SweepStats {
        let mut stats = SweepStats::new();

        let courses = match self.monitor.discover().await {
            Ok(courses) => courses,
            Err(e) => {
                log::error!("Course discovery failed, skipping this sweep: {}", e);
                stats.discovery_error = Some(e.to_string());
                stats.end_time = Utc::now();
                return stats;
            }
        };
        if courses.is_empty() {
            log::warn!("No courses found");
        }

        self.run_courses(courses, stop, &mut stats).await;
        stats.end_time = Utc::now();
        stats
    }

    /// One sweep restricted to the given courses (no discovery).
    pub async fn sweep_courses(&self, courses: Vec<Course>, stop: &StopSignal) -> SweepStats {
        let mut stats = SweepStats::new();
        self.run_courses(courses, stop, &mut stats).await;
        stats.end_time = Utc::now();
        stats
    }

    async fn run_courses(&self, courses: Vec<Course>, stop: &StopSignal, stats: &mut SweepStats) {
        stats.discovered = courses.len();

        let mut results = stream::iter(courses)
            .map(|course| {
                let stop = stop.clone();
                let monitor = Arc::clone(&self.monitor);
                async move {
                    if *stop.borrow() {
                        return (course, None);
                    }
                    log::info!("Checking {}", course.label());
                    let result = monitor.run_cycle(&course).await;
                    (course, Some(result))
                }
            })
            .buffer_unordered(self.max_concurrent);

        while let Some((course, result)) = results.next().await {
            match result {
                None => stats.skipped += 1,
                Some(Ok(report)) => {
                    stats.succeeded += 1;
                    stats.notifications += report.delivered;
                    if report.is_halted() {
                        stats.halted += 1;
                    }
                }
                Some(Err(e)) => {
                    log::warn!("Error checking {}: {}", course.label(), e);
                    stats.failures.push(CourseFailure {
                        course: course.code.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

fn log_summary(sweep_no: u64, stats: &SweepStats) {
    let elapsed = stats.end_time - stats.start_time;
    log::info!(
        "Sweep #{} done in {}ms: {} course(s), {} ok, {} failed, {} skipped, {} notification(s)",
        sweep_no,
        elapsed.num_milliseconds(),
        stats.discovered,
        stats.succeeded,
        stats.failed(),
        stats.skipped,
        stats.notifications
    );
    if stats.halted > 0 {
        log::warn!(
            "{} course(s) had undelivered changes; they will be retried next sweep",
            stats.halted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{Harness, course, file};

    fn five_courses(h: &Harness) -> Vec<Course> {
        let courses: Vec<Course> = (1..=5)
            .map(|i| course(&format!("C{i}"), &format!("Course {i}")))
            .collect();
        for c in &courses {
            h.extractor.set(c, "", vec![file("f1", "Intro")]);
        }
        h.portal.set_courses(courses.clone());
        courses
    }

    #[tokio::test]
    async fn test_one_failing_course_does_not_abort_sweep() {
        let h = Harness::new();
        let courses = five_courses(&h);
        h.portal.fail_fetch(&courses[2]);

        let (_tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 1);
        let stats = scheduler.sweep(&rx).await;

        assert_eq!(stats.discovered, 5);
        assert_eq!(stats.succeeded, 4);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.failures[0].course, CourseId::new("C3"));
        assert_eq!(stats.failures[0].kind, "fetch");
        assert_eq!(stats.notifications, 4);
    }

    #[tokio::test]
    async fn test_parallel_sweep_isolates_failures() {
        let h = Harness::new();
        let courses = five_courses(&h);
        h.portal.fail_fetch(&courses[0]);
        h.notifier.fail_on("(C2)");

        let (_tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 3);
        let stats = scheduler.sweep(&rx).await;

        assert_eq!(stats.succeeded, 4);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.halted, 1);
        assert_eq!(stats.notifications, 3);
        assert!(h.state(&courses[1]).await.1.is_empty());
        assert_eq!(h.state(&courses[4]).await.1, vec!["f1".to_string()]);
    }

    #[tokio::test]
    async fn test_second_sweep_is_quiet() {
        let h = Harness::new();
        five_courses(&h);

        let (_tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 2);
        assert_eq!(scheduler.sweep(&rx).await.notifications, 5);
        assert_eq!(scheduler.sweep(&rx).await.notifications, 0);
    }

    #[tokio::test]
    async fn test_discovery_failure_ends_sweep() {
        let h = Harness::new();
        five_courses(&h);
        h.portal.fail_discovery(true);

        let (_tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 1);
        let stats = scheduler.sweep(&rx).await;

        assert!(stats.discovery_error.is_some());
        assert_eq!(stats.discovered, 0);
        assert_eq!(h.portal.fetches(), 0);
    }

    #[tokio::test]
    async fn test_stop_requested_skips_remaining_courses() {
        let h = Harness::new();
        five_courses(&h);

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 1);
        let stats = scheduler.sweep(&rx).await;

        assert_eq!(stats.skipped, 5);
        assert_eq!(h.portal.fetches(), 0);
    }

    #[tokio::test]
    async fn test_run_exits_on_stop_during_sleep() {
        let h = Harness::new();
        five_courses(&h);

        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(3600), 1);
        let handle = tokio::spawn(async move { scheduler.run(rx).await });

        // Wait for the first sweep to deliver, then stop while it sleeps.
        for _ in 0..500 {
            if h.notifier.sent().len() == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(h.portal.fetches(), 5);
        assert_eq!(h.notifier.sent().len(), 5);
    }

    #[tokio::test]
    async fn test_stop_mid_sweep_finishes_current_course() {
        let h = Harness::new();
        let courses = five_courses(&h);

        let (tx, rx) = watch::channel(false);
        h.notifier.stop_on("(C2)", tx);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 1);
        let stats = scheduler.sweep(&rx).await;

        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.notifications, 2);
        assert_eq!(h.state(&courses[1]).await.1, vec!["f1".to_string()]);
        assert!(h.state(&courses[2]).await.1.is_empty());
        assert_eq!(h.portal.fetches(), 2);
    }

    #[tokio::test]
    async fn test_non_stop_signal_does_not_cut_sleep_short() {
        let h = Harness::new();
        five_courses(&h);

        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(3600), 1);
        let handle = tokio::spawn(async move { scheduler.run(rx).await });

        for _ in 0..500 {
            if h.notifier.sent().len() == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(false).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.portal.fetches(), 5);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(h.portal.fetches(), 5);
    }

    #[tokio::test]
    async fn test_sweep_courses_without_discovery() {
        let h = Harness::new();
        let courses = five_courses(&h);
        h.portal.fail_discovery(true);

        let (_tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(h.monitor.clone(), Duration::from_secs(60), 1);
        let stats = scheduler.sweep_courses(vec![courses[0].clone()], &rx).await;

        assert_eq!(stats.succeeded, 1);
        assert_eq!(h.portal.fetches(), 1);
    }
}
