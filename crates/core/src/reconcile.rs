//! Episode reconciliation.
//!
//! Compares a subscription's watermark against freshly observed episodes,
//! picks one release per new episode number and advances the watermark.
//!
//! When several releases share an episode number, the last one in source
//! order is queued. Callers that prefer a particular release should narrow
//! the candidates with the subscription's filters first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::download::DownloadTask;
use crate::episode::Episode;
use crate::subscription::Subscription;

/// Result of reconciling one subscription.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The subscription after reconciliation.
    pub subscription: Subscription,
    /// Download tasks in ascending episode order.
    pub queue: Vec<DownloadTask>,
}

impl Reconciliation {
    fn unchanged(subscription: &Subscription) -> Self {
        Self {
            subscription: subscription.clone(),
            queue: Vec::new(),
        }
    }

    /// Returns true if the watermark moved.
    pub fn advanced(&self, before: &Subscription) -> bool {
        self.subscription.watermark > before.watermark
    }
}

/// Reconcile observed episodes against a subscription.
///
/// With `ignore_old`, episodes at or below the watermark are dropped before
/// anything else. Without it they are still considered but can never move
/// the watermark, and only numbers above it are queued in either case.
pub fn reconcile(
    subscription: &Subscription,
    observed: &[Episode],
    ignore_old: bool,
    now: DateTime<Utc>,
) -> Reconciliation {
    let current = subscription.watermark;

    let considered = observed
        .iter()
        .filter(|e| !ignore_old || e.episode > current);

    // Last instance per number wins
    let mut latest: BTreeMap<u32, &Episode> = BTreeMap::new();
    for episode in considered {
        latest.insert(episode.episode, episode);
    }

    let highest = match latest.keys().next_back() {
        Some(&highest) if highest > current => highest,
        _ => return Reconciliation::unchanged(subscription),
    };

    let queue = latest
        .range(current + 1..=highest)
        .map(|(_, episode)| DownloadTask::from_episode(episode, now))
        .collect();

    let mut updated = subscription.clone();
    updated.advance(highest, now);

    Reconciliation {
        subscription: updated,
        queue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::SubscriptionStatus;

    fn episode(number: u32, group: &str) -> Episode {
        Episode {
            series_name: "Show A".to_string(),
            episode: number,
            title: format!("[{}] Show A - {:02}", group, number),
            subtitle_group: Some(group.to_string()),
            download: format!("magnet:?xt=urn:btih:{}-{}", group, number),
            observed_at: Utc::now(),
        }
    }

    fn subscription(watermark: u32) -> Subscription {
        Subscription::new("Show A", watermark, Utc::now())
    }

    fn queued(result: &Reconciliation) -> Vec<u32> {
        result.queue.iter().map(|t| t.episode).collect()
    }

    #[test]
    fn test_example_gap_and_duplicate() {
        let sub = subscription(3);
        let observed = vec![episode(4, "main"), episode(4, "alt"), episode(6, "main")];
        let now = Utc::now();

        let result = reconcile(&sub, &observed, false, now);

        assert_eq!(result.subscription.watermark, 6);
        assert_eq!(result.subscription.status, SubscriptionStatus::Updated);
        assert_eq!(result.subscription.updated_time, Some(now));
        assert_eq!(queued(&result), vec![4, 6]);
        assert_eq!(result.queue[0].download, "magnet:?xt=urn:btih:alt-4");
        assert!(result.advanced(&sub));
    }

    #[test]
    fn test_empty_observation_is_noop() {
        let sub = subscription(3);
        for ignore_old in [true, false] {
            let result = reconcile(&sub, &[], ignore_old, Utc::now());
            assert_eq!(result.subscription, sub);
            assert!(result.queue.is_empty());
        }
    }

    #[test]
    fn test_old_episodes_never_advance() {
        let sub = subscription(5);
        let observed = vec![episode(1, "main"), episode(5, "main"), episode(3, "alt")];
        for ignore_old in [true, false] {
            let result = reconcile(&sub, &observed, ignore_old, Utc::now());
            assert_eq!(result.subscription.watermark, 5);
            assert_eq!(result.subscription.status, SubscriptionStatus::Followed);
            assert!(result.queue.is_empty());
            assert!(!result.advanced(&sub));
        }
    }

    #[test]
    fn test_queue_strictly_above_watermark_and_increasing() {
        let sub = subscription(2);
        let observed = vec![
            episode(7, "main"),
            episode(1, "main"),
            episode(3, "main"),
            episode(2, "main"),
            episode(5, "alt"),
            episode(3, "alt"),
        ];
        for ignore_old in [true, false] {
            let result = reconcile(&sub, &observed, ignore_old, Utc::now());
            let numbers = queued(&result);
            assert_eq!(numbers, vec![3, 5, 7]);
            assert!(numbers.windows(2).all(|w| w[0] < w[1]));
            assert!(numbers.iter().all(|&n| n > 2));
            assert_eq!(result.subscription.watermark, 7);
        }
    }

    #[test]
    fn test_tasks_are_queued() {
        let result = reconcile(&subscription(0), &[episode(1, "main")], true, Utc::now());
        assert_eq!(result.queue.len(), 1);
        assert_eq!(
            result.queue[0].status,
            crate::download::DownloadStatus::Queued
        );
        assert_eq!(result.queue[0].series_name, "Show A");
    }

    #[test]
    fn test_filters_survive_reconcile() {
        let mut sub = subscription(0);
        sub.filters.include = vec!["1080p".to_string()];
        let result = reconcile(&sub, &[episode(2, "main")], false, Utc::now());
        assert_eq!(result.subscription.filters, sub.filters);
    }
}
