//! Periodic refresh scheduler.
//!
//! Runs a refresh cycle over all active subscriptions every
//! `refresh.interval_secs`. Cycles share the service's write lock with
//! manual refreshes, so the two never reconcile at the same time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::service::{RefreshReport, RefreshRequest, RefreshTrigger, SubscriptionService};

/// Errors for scheduler control.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler not running")]
    NotRunning,

    #[error("refresh interval must be positive")]
    InvalidInterval,
}

/// Current status of the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<RefreshReport>,
}

/// Drives refresh cycles on a fixed interval.
pub struct RefreshScheduler {
    service: Arc<SubscriptionService>,
    interval: Duration,
    running: Arc<AtomicBool>,
    last_report: Arc<RwLock<Option<RefreshReport>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RefreshScheduler {
    pub fn new(service: Arc<SubscriptionService>, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            service,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            last_report: Arc::new(RwLock::new(None)),
            shutdown_tx,
        }
    }

    /// Create a scheduler using the service's configured interval.
    pub fn from_config(service: Arc<SubscriptionService>) -> Self {
        let interval = Duration::from_secs(service.config().interval_secs);
        Self::new(service, interval)
    }

    /// Start the scheduler (spawns the refresh loop).
    ///
    /// The first cycle runs one interval after start.
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Refresh scheduler already running");
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            "Starting refresh scheduler (interval: {}s)",
            self.interval.as_secs()
        );
        self.spawn_refresh_loop();
        Ok(())
    }

    /// Stop the scheduler. A cycle already in progress finishes.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Refresh scheduler not running");
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping refresh scheduler");
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let last_report = self.last_report.read().await.clone();
        SchedulerStatus {
            running: self.is_running(),
            interval_secs: self.interval.as_secs(),
            last_run_at: last_report.as_ref().and_then(|r| r.started_at),
            last_report,
        }
    }

    /// Run one scheduled cycle immediately.
    pub async fn run_once(&self) -> Option<RefreshReport> {
        Self::run_cycle(&self.service, &self.last_report).await
    }

    async fn run_cycle(
        service: &SubscriptionService,
        last_report: &RwLock<Option<RefreshReport>>,
    ) -> Option<RefreshReport> {
        debug!("Scheduled refresh starting");
        match service
            .refresh(&RefreshRequest::default(), RefreshTrigger::Scheduler)
            .await
        {
            Ok(report) => {
                *last_report.write().await = Some(report.clone());
                Some(report)
            }
            Err(e) => {
                error!("Scheduled refresh failed: {}", e);
                None
            }
        }
    }

    fn spawn_refresh_loop(&self) {
        let running = Arc::clone(&self.running);
        let service = Arc::clone(&self.service);
        let last_report = Arc::clone(&self.last_report);
        let period = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Refresh loop started");
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Refresh loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::run_cycle(&service, &last_report).await;
                    }
                }
            }
            info!("Refresh loop stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SeriesCatalog, SqliteCatalog};
    use crate::config::RefreshConfig;
    use crate::download::SqliteDownloadQueue;
    use crate::subscription::{SqliteSubscriptionStore, Subscription, SubscriptionStore};
    use crate::testing::{fixtures, MockEpisodeSource};

    async fn create_test_scheduler(
        interval: Duration,
    ) -> (RefreshScheduler, Arc<MockEpisodeSource>) {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        catalog
            .store_series(&[fixtures::series("Show A", &["g1"])])
            .unwrap();

        let store = Arc::new(SqliteSubscriptionStore::in_memory().unwrap());
        store
            .upsert(&Subscription::new("Show A", 0, Utc::now()))
            .unwrap();

        let source = Arc::new(MockEpisodeSource::new());
        source
            .set_episodes("Show A", fixtures::episodes("Show A", 1..=2, "g1"))
            .await;

        let service = Arc::new(SubscriptionService::new(
            catalog,
            source.clone(),
            store,
            Arc::new(SqliteDownloadQueue::in_memory().unwrap()),
            RefreshConfig::default(),
        ));

        (RefreshScheduler::new(service, interval), source)
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (scheduler, _) = create_test_scheduler(Duration::from_secs(3600)).await;

        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert!(matches!(
            scheduler.start(),
            Err(SchedulerError::AlreadyRunning)
        ));

        scheduler.stop().unwrap();
        assert!(!scheduler.is_running());
        assert!(matches!(scheduler.stop(), Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let (scheduler, _) = create_test_scheduler(Duration::ZERO).await;
        assert!(matches!(
            scheduler.start(),
            Err(SchedulerError::InvalidInterval)
        ));
    }

    #[tokio::test]
    async fn test_run_once_records_report() {
        let (scheduler, source) = create_test_scheduler(Duration::from_secs(3600)).await;

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.updated(), 1);
        assert_eq!(source.fetch_count().await, 1);

        let status = scheduler.status().await;
        assert!(!status.running);
        assert!(status.last_run_at.is_some());
        assert_eq!(status.last_report.unwrap().series.len(), 1);
    }
}
