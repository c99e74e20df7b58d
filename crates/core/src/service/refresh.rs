//! Refresh cycles.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CommandResult, SubscriptionService};
use crate::download::DownloadTask;
use crate::error::CommandError;
use crate::filter::FilterRules;
use crate::metrics;
use crate::reconcile::reconcile;
use crate::subscription::Subscription;

/// Options for a refresh cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Only refresh these subscriptions (exact names). Empty means all
    /// active subscriptions.
    #[serde(default)]
    pub names: Vec<String>,
    /// Hand new episodes to the download queue. Defaults to the configured
    /// value.
    #[serde(default)]
    pub download: Option<bool>,
    /// Consider episodes at or below the watermark. Defaults to the inverse
    /// of the configured `ignore_old`.
    #[serde(default)]
    pub not_ignore: Option<bool>,
}

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Scheduler,
    Manual,
}

impl RefreshTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            RefreshTrigger::Scheduler => "scheduler",
            RefreshTrigger::Manual => "manual",
        }
    }
}

/// Result of refreshing one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Updated {
        previous: u32,
        watermark: u32,
        /// Episode numbers handed to the download queue.
        queued: Vec<u32>,
    },
    Unchanged {
        watermark: u32,
    },
    Failed {
        reason: String,
    },
}

impl RefreshOutcome {
    fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Updated { .. } => "updated",
            RefreshOutcome::Unchanged { .. } => "unchanged",
            RefreshOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesOutcome {
    pub series_name: String,
    #[serde(flatten)]
    pub outcome: RefreshOutcome,
}

/// Summary of a refresh cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    pub started_at: Option<DateTime<Utc>>,
    /// Subscriptions reverted by the staleness sweep.
    pub expired: usize,
    /// Failed downloads re-offered to the queue.
    pub reoffered: usize,
    /// Download tasks queued by this cycle.
    pub queued: usize,
    /// Requested names with no active subscription.
    pub missing: Vec<String>,
    pub series: Vec<SeriesOutcome>,
    /// Outcomes of scripted series.
    #[serde(default)]
    pub scripts: Vec<SeriesOutcome>,
}

impl RefreshReport {
    pub fn updated(&self) -> usize {
        self.count("updated")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    fn count(&self, label: &str) -> usize {
        self.series
            .iter()
            .chain(&self.scripts)
            .filter(|s| s.outcome.label() == label)
            .count()
    }

    pub fn outcome(&self, series_name: &str) -> Option<&RefreshOutcome> {
        self.series
            .iter()
            .find(|s| s.series_name == series_name)
            .map(|s| &s.outcome)
    }
}

impl SubscriptionService {
    /// Run a refresh cycle and report it as a command result.
    pub async fn update(&self, request: &RefreshRequest) -> Result<CommandResult, CommandError> {
        let result = self
            .refresh(request, RefreshTrigger::Manual)
            .await
            .map(|report| {
                let mut message = format!(
                    "Refreshed {} subscriptions: {} updated, {} failed",
                    report.series.len(),
                    report.updated(),
                    report.failed()
                );
                if !report.scripts.is_empty() {
                    message.push_str(&format!(" ({} scripts)", report.scripts.len()));
                }
                let result = if report.failed() > 0 || !report.missing.is_empty() {
                    CommandResult::warning(message)
                } else {
                    CommandResult::success(message)
                };
                result.with_data(&report)
            });
        self.respond("update", result)
    }

    /// Run a refresh cycle.
    ///
    /// Sweeps stale subscriptions, optionally re-offers failed downloads,
    /// advances scripted series, then fetches, filters and reconciles each
    /// selected subscription in turn. A failure for one series is recorded
    /// and the cycle moves on.
    pub async fn refresh(
        &self,
        request: &RefreshRequest,
        trigger: RefreshTrigger,
    ) -> Result<RefreshReport, CommandError> {
        let _guard = self.write_lock.lock().await;
        let started = Instant::now();
        let now = Utc::now();

        let download = request.download.unwrap_or(self.config.download);
        let ignore_old = match request.not_ignore {
            Some(not_ignore) => !not_ignore,
            None => self.config.ignore_old,
        };
        debug!(
            "Refreshing (trigger: {}, download: {}, ignore_old: {}, names: {:?})",
            trigger.as_str(),
            download,
            ignore_old,
            request.names
        );

        let mut report = RefreshReport {
            started_at: Some(now),
            ..Default::default()
        };

        report.expired = self.sweep_stale_locked(now)?;

        let subscriptions = self.select_subscriptions(&request.names, &mut report)?;

        if download {
            let reoffered = self.downloader.requeue_failed()?;
            if !reoffered.is_empty() {
                info!("Re-offered {} failed downloads", reoffered.len());
            }
            report.reoffered = reoffered.len();
            metrics::DOWNLOADS_REQUEUED.inc_by(reoffered.len() as u64);
        }

        self.refresh_scripts(download, now, &mut report)?;

        for subscription in subscriptions {
            let outcome = self
                .refresh_one(&subscription, ignore_old, download, &mut report)
                .await;

            metrics::SERIES_REFRESHED
                .with_label_values(&[outcome.label()])
                .inc();
            report.series.push(SeriesOutcome {
                series_name: subscription.series_name,
                outcome,
            });
        }

        metrics::REFRESH_CYCLES
            .with_label_values(&[trigger.as_str()])
            .inc();
        metrics::REFRESH_DURATION
            .with_label_values(&[])
            .observe(started.elapsed().as_secs_f64());

        info!(
            "Refresh finished: {} series, {} updated, {} failed, {} queued",
            report.series.len(),
            report.updated(),
            report.failed(),
            report.queued
        );
        Ok(report)
    }

    fn select_subscriptions(
        &self,
        names: &[String],
        report: &mut RefreshReport,
    ) -> Result<Vec<Subscription>, CommandError> {
        if names.is_empty() {
            return Ok(self.store.list_active()?);
        }

        let mut selected = Vec::new();
        for name in names {
            match self.store.get(name)? {
                Some(subscription) if subscription.is_active() => selected.push(subscription),
                _ => {
                    warn!("Missing followed series '{}'", name);
                    report.missing.push(name.clone());
                }
            }
        }
        Ok(selected)
    }

    async fn refresh_one(
        &self,
        subscription: &Subscription,
        ignore_old: bool,
        download: bool,
        report: &mut RefreshReport,
    ) -> RefreshOutcome {
        let name = &subscription.series_name;

        let series = match self.catalog.get(name) {
            Ok(series) => series,
            Err(e) => {
                warn!("Cannot refresh {}: {}", name, e);
                return RefreshOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        debug!("Fetching {} from {}", name, self.source.name());
        let observed = match self
            .source
            .fetch_episodes(&series, ignore_old, self.config.max_pages)
            .await
        {
            Ok(observed) => {
                metrics::SOURCE_REQUESTS
                    .with_label_values(&[self.source.name(), "fetch", "success"])
                    .inc();
                observed
            }
            Err(e) => {
                metrics::SOURCE_REQUESTS
                    .with_label_values(&[self.source.name(), "fetch", "error"])
                    .inc();
                warn!("Failed to fetch {}, skipping: {}", name, e);
                return RefreshOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let candidates = match FilterRules::from_filters(&subscription.filters) {
            Ok(rules) => rules.apply(observed),
            Err(e) => {
                warn!("Bad filters on {}: {}", name, e);
                return RefreshOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let reconciliation = reconcile(subscription, &candidates, ignore_old, Utc::now());
        if !reconciliation.advanced(subscription) {
            return RefreshOutcome::Unchanged {
                watermark: subscription.watermark,
            };
        }

        let queued: Vec<u32> = reconciliation.queue.iter().map(|t| t.episode).collect();
        if let Err(reason) = self.hand_off(name, &reconciliation.queue, download, report) {
            return RefreshOutcome::Failed { reason };
        }

        // Queued episodes whose watermark fails to save are offered again
        // next cycle; re-enqueueing the same episode is idempotent.
        if let Err(e) = self.store.upsert(&reconciliation.subscription) {
            warn!("Failed to save {}: {}", name, e);
            return RefreshOutcome::Failed {
                reason: e.to_string(),
            };
        }

        info!(
            "{} updated, episode: {}",
            name, reconciliation.subscription.watermark
        );

        RefreshOutcome::Updated {
            previous: subscription.watermark,
            watermark: reconciliation.subscription.watermark,
            queued,
        }
    }

    /// Queue every published episode above each active scripted series'
    /// counter and advance the counter.
    fn refresh_scripts(
        &self,
        download: bool,
        now: DateTime<Utc>,
        report: &mut RefreshReport,
    ) -> Result<(), CommandError> {
        let Some(scripts) = self.scripts.as_ref() else {
            return Ok(());
        };

        for mut scripted in scripts.list()? {
            if !scripted.is_active() {
                continue;
            }

            let pending = scripted.pending(now);
            let outcome = match pending.last().map(|t| t.episode) {
                None => RefreshOutcome::Unchanged {
                    watermark: scripted.episode,
                },
                Some(latest) => match self.hand_off(&scripted.name, &pending, download, report) {
                    Err(reason) => RefreshOutcome::Failed { reason },
                    Ok(()) => {
                        let previous = scripted.episode;
                        scripted.advance(latest, now);
                        match scripts.save(&scripted) {
                            Ok(()) => {
                                info!("Script {} updated, episode: {}", scripted.name, latest);
                                RefreshOutcome::Updated {
                                    previous,
                                    watermark: latest,
                                    queued: pending.iter().map(|t| t.episode).collect(),
                                }
                            }
                            Err(e) => {
                                warn!("Failed to save script {}: {}", scripted.name, e);
                                RefreshOutcome::Failed {
                                    reason: e.to_string(),
                                }
                            }
                        }
                    }
                },
            };

            metrics::SERIES_REFRESHED
                .with_label_values(&[outcome.label()])
                .inc();
            report.scripts.push(SeriesOutcome {
                series_name: scripted.name,
                outcome,
            });
        }
        Ok(())
    }

    /// Hand tasks to the download queue. Runs before the advanced counter is
    /// saved: any failure, including a partial enqueue, leaves the episodes
    /// above the stored watermark for the next cycle.
    fn hand_off(
        &self,
        name: &str,
        tasks: &[DownloadTask],
        download: bool,
        report: &mut RefreshReport,
    ) -> Result<(), String> {
        if !download || tasks.is_empty() {
            return Ok(());
        }

        let count = match self.downloader.enqueue(tasks) {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to queue downloads for {}: {}", name, e);
                return Err(e.to_string());
            }
        };

        report.queued += count;
        metrics::EPISODES_QUEUED.inc_by(count as u64);

        if count < tasks.len() {
            warn!(
                "Only {} of {} downloads queued for {}",
                count,
                tasks.len(),
                name
            );
            return Err(format!(
                "Only {} of {} downloads queued",
                count,
                tasks.len()
            ));
        }
        Ok(())
    }
}
