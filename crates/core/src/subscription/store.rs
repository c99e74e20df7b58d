//! Subscription storage trait and types.

use thiserror::Error;

use super::{Subscription, SubscriptionStatus};

/// Errors for subscription storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record for {series}: {reason}")]
    Corrupt { series: String, reason: String },
}

/// Filter for listing subscriptions.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    /// Only return subscriptions in this status.
    pub status: Option<SubscriptionStatus>,
    /// Include deleted subscriptions when no status is given.
    pub include_deleted: bool,
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by status.
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Include deleted subscriptions.
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

/// Trait for subscription storage backends.
///
/// Reads return owned values; a mutation is written back as a whole with
/// [`SubscriptionStore::upsert`].
pub trait SubscriptionStore: Send + Sync {
    /// Get the subscription for a series name (exact match).
    fn get(&self, series_name: &str) -> Result<Option<Subscription>, StoreError>;

    /// Insert or replace a subscription.
    fn upsert(&self, subscription: &Subscription) -> Result<(), StoreError>;

    /// Insert or replace several subscriptions atomically: either every
    /// record is written or none is.
    fn upsert_all(&self, subscriptions: &[Subscription]) -> Result<(), StoreError>;

    /// List subscriptions matching the filter, ordered by series name.
    fn list(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>, StoreError>;

    /// List followed and updated subscriptions.
    fn list_active(&self) -> Result<Vec<Subscription>, StoreError> {
        self.list(&SubscriptionFilter::new())
    }
}
