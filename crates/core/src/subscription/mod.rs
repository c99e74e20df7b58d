//! Subscriptions: per-series follow records with status and watermark.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteSubscriptionStore;
pub use store::{StoreError, SubscriptionFilter, SubscriptionStore};
pub use types::{Subscription, SubscriptionFilters, SubscriptionStatus};
