//! Subscription lifecycle commands.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CommandResult, SubscriptionService};
use crate::catalog::{Series, SubtitleGroup};
use crate::error::CommandError;
use crate::filter::{compile_regex, parse_list};
use crate::metrics;
use crate::subscription::{Subscription, SubscriptionStatus};

/// Requested filter changes. Absent fields are left untouched.
///
/// List-valued fields are comma-separated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Subtitle group names or ids.
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
    /// Title pattern. An empty string clears it.
    #[serde(default)]
    pub regex: Option<String>,
}

/// Live filter state of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub name: String,
    /// Every subtitle group known for the series.
    pub subtitle_groups: Vec<SubtitleGroup>,
    /// Subtitle groups the subscription is restricted to.
    pub followed: Vec<SubtitleGroup>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub regex: Option<String>,
}

impl FilterState {
    fn new(series: &Series, subscription: &Subscription) -> Self {
        Self {
            name: series.name.clone(),
            subtitle_groups: series.subtitle_groups.clone(),
            followed: subscription
                .filters
                .subtitle_groups
                .iter()
                .filter_map(|id| series.group_by_id(id).cloned())
                .collect(),
            include: subscription.filters.include.clone(),
            exclude: subscription.filters.exclude.clone(),
            regex: subscription.filters.regex.clone(),
        }
    }
}

fn record_transition(operation: &str, status: SubscriptionStatus) {
    metrics::SUBSCRIPTION_TRANSITIONS
        .with_label_values(&[operation, status.as_str()])
        .inc();
}

impl SubscriptionService {
    /// Follow a series, or re-follow a deleted one.
    ///
    /// The series is resolved by case-insensitive substring. Without an
    /// explicit episode the watermark starts at the highest known episode.
    pub async fn add(
        &self,
        name: &str,
        episode: Option<u32>,
    ) -> Result<CommandResult, CommandError> {
        debug!("add name: {} episode: {:?}", name, episode);
        let _guard = self.write_lock.lock().await;
        let result = self.add_locked(name, episode);
        self.respond("add", result)
    }

    fn add_locked(&self, name: &str, episode: Option<u32>) -> Result<CommandResult, CommandError> {
        let series = self.catalog.resolve(name)?;
        let now = Utc::now();

        let (subscription, message) = match self.store.get(&series.name)? {
            Some(existing) if existing.is_active() => {
                return Err(CommandError::AlreadyExists(format!(
                    "{} is already followed",
                    series.name
                )));
            }
            Some(mut existing) => {
                existing.refollow(self.initial_watermark(&series, episode)?, now);
                (existing, format!("{} has been followed again", series.name))
            }
            None => (
                Subscription::new(&series.name, self.initial_watermark(&series, episode)?, now),
                format!("{} added to subscriptions", series.name),
            ),
        };

        self.store.upsert(&subscription)?;
        record_transition("add", subscription.status);
        info!(
            "Following {} from episode {}",
            subscription.series_name, subscription.watermark
        );

        Ok(CommandResult::success(message).with_data(&subscription))
    }

    fn initial_watermark(
        &self,
        series: &Series,
        episode: Option<u32>,
    ) -> Result<u32, CommandError> {
        match episode {
            Some(episode) => Ok(episode),
            None => Ok(self.catalog.max_known_episode(&series.name)?),
        }
    }

    /// Soft-delete one subscription, or every active one with `clear_all`.
    ///
    /// `clear_all` requires `confirm`.
    pub async fn delete(
        &self,
        name: Option<&str>,
        clear_all: bool,
        confirm: bool,
    ) -> Result<CommandResult, CommandError> {
        debug!(
            "delete name: {:?} clear_all: {} confirm: {}",
            name, clear_all, confirm
        );
        let _guard = self.write_lock.lock().await;
        let result = self.delete_locked(name, clear_all, confirm);
        self.respond("delete", result)
    }

    fn delete_locked(
        &self,
        name: Option<&str>,
        clear_all: bool,
        confirm: bool,
    ) -> Result<CommandResult, CommandError> {
        let now = Utc::now();

        if clear_all {
            if !confirm {
                return Err(CommandError::Validation(
                    "Deleting all subscriptions requires confirmation".to_string(),
                ));
            }

            let mut active = self.store.list_active()?;
            for subscription in active.iter_mut() {
                subscription.soft_delete(now);
            }
            self.store.upsert_all(&active)?;
            metrics::SUBSCRIPTION_TRANSITIONS
                .with_label_values(&["delete", SubscriptionStatus::Deleted.as_str()])
                .inc_by(active.len() as u64);
            info!("Deleted all {} subscriptions", active.len());

            return Ok(CommandResult::success(format!(
                "All {} subscriptions have been deleted",
                active.len()
            ))
            .with_data(&serde_json::json!({ "deleted": active.len() })));
        }

        let Some(name) = name.filter(|n| !n.is_empty()) else {
            return Ok(CommandResult::warning("Nothing has been done."));
        };

        let mut subscription = self
            .store
            .get(name)?
            .filter(Subscription::is_active)
            .ok_or_else(|| CommandError::NotFound(format!("{} is not followed", name)))?;

        subscription.soft_delete(now);
        self.store.upsert(&subscription)?;
        record_transition("delete", SubscriptionStatus::Deleted);
        info!("Deleted subscription {}", name);

        Ok(CommandResult::success(format!("{} has been deleted", name)).with_data(&subscription))
    }

    /// Force a subscription's watermark. Falls back to scripted series.
    pub async fn mark(&self, name: &str, episode: u32) -> Result<CommandResult, CommandError> {
        debug!("mark name: {} episode: {}", name, episode);
        let _guard = self.write_lock.lock().await;
        let result = self.mark_locked(name, episode);
        self.respond("mark", result)
    }

    fn mark_locked(&self, name: &str, episode: u32) -> Result<CommandResult, CommandError> {
        let message = format!("{} has been marked as episode {}", name, episode);

        if let Some(mut subscription) = self.store.get(name)? {
            subscription.mark(episode, Utc::now());
            self.store.upsert(&subscription)?;
            return Ok(CommandResult::success(message).with_data(&subscription));
        }

        if let Some(scripts) = self.scripts.as_ref() {
            if let Some(mut scripted) = scripts.get(name)? {
                scripted.episode = episode;
                scripts.save(&scripted)?;
                return Ok(CommandResult::success(message).with_data(&scripted));
            }
        }

        Err(CommandError::NotFound(format!(
            "Subscription or script {} does not exist",
            name
        )))
    }

    /// Set a subscription's status by numeric code.
    ///
    /// Only declared, non-zero codes are accepted.
    pub async fn status_change(
        &self,
        name: &str,
        code: i64,
    ) -> Result<CommandResult, CommandError> {
        debug!("status name: {} code: {}", name, code);
        let _guard = self.write_lock.lock().await;
        let result = self.status_change_locked(name, code);
        self.respond("status", result)
    }

    fn status_change_locked(&self, name: &str, code: i64) -> Result<CommandResult, CommandError> {
        let status = match SubscriptionStatus::from_code(code) {
            Some(status) if code != 0 => status,
            _ => return Err(CommandError::Validation(format!("Invalid status: {}", code))),
        };

        let mut subscription = self
            .store
            .get(name)?
            .ok_or_else(|| CommandError::NotFound(format!("{} is not followed", name)))?;

        subscription.set_status(status, Utc::now());
        self.store.upsert(&subscription)?;
        record_transition("status", status);

        Ok(
            CommandResult::success(format!("{} has been marked as {}", name, status))
                .with_data(&subscription),
        )
    }

    /// Edit a subscription's filters and report the resulting state.
    ///
    /// Unknown subtitle groups are dropped. A malformed regex rejects the
    /// whole edit.
    pub async fn filter(
        &self,
        name: &str,
        request: &FilterRequest,
    ) -> Result<CommandResult, CommandError> {
        debug!("filter name: {} request: {:?}", name, request);
        let _guard = self.write_lock.lock().await;
        let result = self.filter_locked(name, request);
        self.respond("filter", result)
    }

    fn filter_locked(
        &self,
        name: &str,
        request: &FilterRequest,
    ) -> Result<CommandResult, CommandError> {
        let series = self.catalog.resolve(name)?;
        let mut subscription = self.store.get(&series.name)?.ok_or_else(|| {
            CommandError::NotFound(format!(
                "{} is not subscribed, add it first",
                series.name
            ))
        })?;

        if let Some(ref subtitle) = request.subtitle {
            let mut ids: Vec<String> = Vec::new();
            for key in parse_list(subtitle) {
                match series.find_group(&key) {
                    Some(group) if !ids.contains(&group.id) => ids.push(group.id.clone()),
                    Some(_) => {}
                    None => debug!("Dropping unknown subtitle group '{}' for {}", key, series.name),
                }
            }
            subscription.filters.subtitle_groups = ids;
        }

        if let Some(ref include) = request.include {
            subscription.filters.include = parse_list(include);
        }

        if let Some(ref exclude) = request.exclude {
            subscription.filters.exclude = parse_list(exclude);
        }

        if let Some(ref regex) = request.regex {
            let pattern = regex.trim();
            subscription.filters.regex = if pattern.is_empty() {
                None
            } else {
                compile_regex(pattern)?;
                Some(pattern.to_string())
            };
        }

        subscription.modified_at = Utc::now();
        self.store.upsert(&subscription)?;

        let state = FilterState::new(&series, &subscription);
        Ok(CommandResult::success(format!("Filters of {} updated", series.name)).with_data(&state))
    }

    /// Revert `Updated` subscriptions and scripted series older than the
    /// staleness window back to `Followed`. Returns how many changed.
    pub async fn sweep_stale(&self, now: DateTime<Utc>) -> Result<usize, CommandError> {
        let _guard = self.write_lock.lock().await;
        self.sweep_stale_locked(now)
    }

    pub(super) fn sweep_stale_locked(&self, now: DateTime<Utc>) -> Result<usize, CommandError> {
        let window = Duration::hours(i64::from(self.config.staleness_hours));
        let mut expired = 0;

        for mut subscription in self.store.list_active()? {
            if subscription.expire_if_stale(now, window) {
                self.store.upsert(&subscription)?;
                debug!("{} is no longer marked updated", subscription.series_name);
                expired += 1;
            }
        }

        if let Some(scripts) = self.scripts.as_ref() {
            for mut scripted in scripts.list()? {
                if scripted.expire_if_stale(now, window) {
                    scripts.save(&scripted)?;
                    debug!("Script {} is no longer marked updated", scripted.name);
                    expired += 1;
                }
            }
        }

        metrics::STALE_EXPIRED.inc_by(expired as u64);
        Ok(expired)
    }
}
