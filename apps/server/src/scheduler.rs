//! Background job runner for scheduled syncs, health sweeps and rollups.
//!
//! Each job runs on its own task. A failing or panicking handler is logged
//! and counted, and the job keeps its schedule.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use unibridge_connect::{BridgeOrchestrator, PlatformSyncResult, SyncOptions};

use crate::events::{self, EventBus, ServerEvent};

pub const INVENTORY_SYNC_JOB: &str = "inventory-sync";
pub const HEALTH_CHECK_JOB: &str = "health-check";
pub const STATS_ROLLUP_JOB: &str = "stats-rollup";

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every `Duration`, first run one period after registration.
    Interval(Duration),
    /// Once a day at a UTC wall-clock time.
    DailyAt(NaiveTime),
}

impl Schedule {
    /// Time to wait from `now` until the next run.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Schedule::Interval(period) => *period,
            Schedule::DailyAt(time) => {
                let today = now.date_naive().and_time(*time).and_utc();
                let next = if today > now {
                    today
                } else {
                    today + ChronoDuration::days(1)
                };
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Interval(period) => write!(f, "every {}s", period.as_secs()),
            Schedule::DailyAt(time) => write!(f, "daily at {} UTC", time.format("%H:%M")),
        }
    }
}

type JobHandler = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct JobRuns {
    run_count: u64,
    failure_count: u64,
    last_run: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct Job {
    schedule: Schedule,
    runs: Arc<Mutex<JobRuns>>,
    task: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,
    pub schedule: String,
    pub run_count: u64,
    pub failure_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Named job table driving the bridge's periodic work.
pub struct SyncScheduler {
    orchestrator: Arc<BridgeOrchestrator>,
    event_bus: EventBus,
    jobs: Mutex<HashMap<String, Job>>,
}

impl SyncScheduler {
    pub fn new(orchestrator: Arc<BridgeOrchestrator>, event_bus: EventBus) -> Self {
        Self {
            orchestrator,
            event_bus,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Starts `handler` on `schedule`, stopping any job already named `id`.
    pub fn register_job<F, Fut>(&self, id: &str, schedule: Schedule, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: JobHandler = Arc::new(move || handler().boxed());
        let runs = Arc::new(Mutex::new(JobRuns::default()));
        let task = tokio::spawn(run_job(
            id.to_string(),
            schedule,
            handler,
            runs.clone(),
            self.event_bus.clone(),
        ));

        let previous = lock(&self.jobs).insert(
            id.to_string(),
            Job {
                schedule,
                runs,
                task,
            },
        );
        if let Some(previous) = previous {
            warn!("Job {} already registered, replacing it", id);
            previous.task.abort();
        }
        info!("Scheduled job {} ({})", id, schedule);
    }

    /// Stops a job. Returns false for unknown ids.
    pub fn stop_job(&self, id: &str) -> bool {
        match lock(&self.jobs).remove(id) {
            Some(job) => {
                job.task.abort();
                info!("Stopped job {}", id);
                true
            }
            None => {
                debug!("stop_job: no job named {}", id);
                false
            }
        }
    }

    pub fn stop_all_jobs(&self) {
        let jobs: Vec<(String, Job)> = lock(&self.jobs).drain().collect();
        for (id, job) in jobs {
            job.task.abort();
            debug!("Stopped job {}", id);
        }
    }

    pub fn job_statuses(&self) -> Vec<JobStatus> {
        let mut statuses: Vec<JobStatus> = lock(&self.jobs)
            .iter()
            .map(|(id, job)| {
                let runs = lock(&job.runs).clone();
                JobStatus {
                    id: id.clone(),
                    schedule: job.schedule.to_string(),
                    run_count: runs.run_count,
                    failure_count: runs.failure_count,
                    last_run: runs.last_run,
                    last_error: runs.last_error,
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Runs a sync now, outside any schedule. `None` syncs every adapter.
    pub async fn trigger_sync(
        &self,
        platform_id: Option<&str>,
        options: SyncOptions,
    ) -> Vec<PlatformSyncResult> {
        info!("Manual sync triggered for {}", platform_id.unwrap_or("all"));
        let Some(platform_id) = platform_id else {
            return self.orchestrator.sync_all(options).await;
        };
        let result = self.orchestrator.sync_inventory(platform_id, options).await;
        vec![match result {
            Ok(outcome) => PlatformSyncResult {
                platform_id: platform_id.to_string(),
                success: outcome.is_success(),
                result: Some(outcome),
                error: None,
            },
            Err(e) => PlatformSyncResult {
                platform_id: platform_id.to_string(),
                success: false,
                result: None,
                error: Some(e.to_string()),
            },
        }]
    }

    /// Registers `inventory-sync`, `health-check` and `stats-rollup`.
    pub fn register_default_jobs(&self, sync_interval: Duration, health_interval: Duration) {
        let orchestrator = self.orchestrator.clone();
        self.register_job(INVENTORY_SYNC_JOB, Schedule::Interval(sync_interval), move || {
            run_inventory_sync(orchestrator.clone())
        });

        let orchestrator = self.orchestrator.clone();
        self.register_job(HEALTH_CHECK_JOB, Schedule::Interval(health_interval), move || {
            run_health_sweep(orchestrator.clone())
        });

        let orchestrator = self.orchestrator.clone();
        let bus = self.event_bus.clone();
        self.register_job(STATS_ROLLUP_JOB, Schedule::DailyAt(NaiveTime::MIN), move || {
            run_stats_rollup(orchestrator.clone(), bus.clone())
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default jobs
// ─────────────────────────────────────────────────────────────────────────────

async fn run_inventory_sync(orchestrator: Arc<BridgeOrchestrator>) -> anyhow::Result<()> {
    let results = orchestrator.sync_all(SyncOptions::default()).await;
    let failed: Vec<&str> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| r.platform_id.as_str())
        .collect();
    if !failed.is_empty() {
        anyhow::bail!("sync failed for {}", failed.join(", "));
    }
    Ok(())
}

/// Logs unhealthy adapters. No alerting.
async fn run_health_sweep(orchestrator: Arc<BridgeOrchestrator>) -> anyhow::Result<()> {
    let health = orchestrator.health_check().await;
    for report in health.adapters.iter().filter(|r| !r.healthy) {
        warn!(
            "[{}] adapter unhealthy: {}",
            report.platform_id,
            report.message.as_deref().unwrap_or("no details")
        );
    }
    Ok(())
}

async fn run_stats_rollup(orchestrator: Arc<BridgeOrchestrator>, bus: EventBus) -> anyhow::Result<()> {
    let stats = orchestrator.get_stats();
    info!(
        "Daily rollup: {} syncs ({} failed), {} orders, {} shipments, {} webhooks",
        stats.total_syncs,
        stats.failed_syncs,
        stats.orders_created,
        stats.shipments_updated,
        stats.webhooks_processed
    );
    bus.publish(ServerEvent::with_payload(
        events::STATS_ROLLUP,
        serde_json::to_value(&stats)?,
    ));
    Ok(())
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop_all_jobs();
    }
}

async fn run_job(
    id: String,
    schedule: Schedule,
    handler: JobHandler,
    runs: Arc<Mutex<JobRuns>>,
    bus: EventBus,
) {
    loop {
        sleep(schedule.next_delay(Utc::now())).await;
        debug!("Running job {}", id);

        // The handler call itself runs inside catch_unwind too.
        let outcome = AssertUnwindSafe(async { handler().await })
            .catch_unwind()
            .await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };

        let mut state = lock(&runs);
        state.run_count += 1;
        state.last_run = Some(Utc::now());
        if let Some(message) = &failure {
            state.failure_count += 1;
            error!("Job {} failed: {}", id, message);
            bus.publish(ServerEvent::with_payload(
                events::JOB_FAILED,
                json!({ "jobId": id, "error": message }),
            ));
        }
        state.last_error = failure;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler() -> SyncScheduler {
        SyncScheduler::new(Arc::new(BridgeOrchestrator::new()), EventBus::new(16))
    }

    #[test]
    fn test_daily_schedule_waits_for_next_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 22, 30, 0).unwrap();
        let delay = Schedule::DailyAt(NaiveTime::MIN).next_delay(now);
        assert_eq!(delay, Duration::from_secs(90 * 60));

        let midnight = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let delay = Schedule::DailyAt(NaiveTime::MIN).next_delay(midnight);
        assert_eq!(delay, Duration::from_secs(24 * 60 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_on_interval_and_survives_errors() {
        let scheduler = scheduler();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        scheduler.register_job("flaky", Schedule::Interval(Duration::from_secs(10)), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    return Err(anyhow::anyhow!("first run fails"));
                }
                Ok::<(), anyhow::Error>(())
            }
        });

        sleep(Duration::from_secs(25)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let status = &scheduler.job_statuses()[0];
        assert_eq!(status.run_count, 2);
        assert_eq!(status.failure_count, 1);
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_is_contained() {
        let scheduler = scheduler();
        scheduler.register_job("boom", Schedule::Interval(Duration::from_secs(5)), || async {
            if true {
                panic!("handler exploded");
            }
            Ok::<(), anyhow::Error>(())
        });

        sleep(Duration::from_secs(11)).await;
        let status = &scheduler.job_statuses()[0];
        assert_eq!(status.run_count, 2);
        assert_eq!(
            status.last_error.as_deref(),
            Some("panicked: handler exploded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_panicking_before_its_future_is_contained() {
        let scheduler = scheduler();
        scheduler.register_job(
            "eager",
            Schedule::Interval(Duration::from_secs(5)),
            || -> futures::future::Ready<anyhow::Result<()>> { panic!("no future built") },
        );

        sleep(Duration::from_secs(11)).await;
        let status = &scheduler.job_statuses()[0];
        assert_eq!(status.run_count, 2);
        assert_eq!(status.failure_count, 2);
        assert_eq!(status.last_error.as_deref(), Some("panicked: no future built"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_replaces_and_stop_is_safe() {
        let scheduler = scheduler();
        let first = Arc::new(AtomicUsize::new(0));
        let counter = first.clone();
        scheduler.register_job("sync", Schedule::Interval(Duration::from_secs(5)), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), anyhow::Error>(()) }
        });
        scheduler.register_job("sync", Schedule::Interval(Duration::from_secs(60)), || async {
            Ok::<(), anyhow::Error>(())
        });

        sleep(Duration::from_secs(20)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.job_statuses().len(), 1);
        assert_eq!(scheduler.job_statuses()[0].schedule, "every 60s");

        assert!(scheduler.stop_job("sync"));
        assert!(!scheduler.stop_job("sync"));
        assert!(!scheduler.stop_job("never-registered"));
        scheduler.stop_all_jobs();
        assert!(scheduler.job_statuses().is_empty());
    }

    #[tokio::test]
    async fn test_default_jobs_are_registered() {
        let scheduler = scheduler();
        scheduler.register_default_jobs(Duration::from_secs(900), Duration::from_secs(300));
        let ids: Vec<String> = scheduler.job_statuses().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["health-check", "inventory-sync", "stats-rollup"]);
    }

    #[tokio::test]
    async fn test_trigger_sync_for_unknown_platform_reports_failure() {
        let scheduler = scheduler();
        let results = scheduler
            .trigger_sync(Some("ghost"), SyncOptions::default())
            .await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("ghost"));
    }
}
