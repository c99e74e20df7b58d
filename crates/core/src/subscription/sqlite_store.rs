//! SQLite-backed subscription store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{
    StoreError, Subscription, SubscriptionFilter, SubscriptionFilters, SubscriptionStatus,
    SubscriptionStore,
};
use crate::storage::{parse_optional_timestamp, parse_timestamp};

/// SQLite-backed subscription store.
pub struct SqliteSubscriptionStore {
    conn: Mutex<Connection>,
}

impl SqliteSubscriptionStore {
    /// Create a new SQLite subscription store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite subscription store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                series_name TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                watermark INTEGER NOT NULL DEFAULT 0,
                updated_time TEXT,
                filters TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_status ON subscriptions(status);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("subscription store lock poisoned".to_string()))
    }

    fn row_to_subscription(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<Result<Subscription, StoreError>> {
        let series_name: String = row.get(0)?;
        let status_code: i64 = row.get(1)?;
        let watermark: u32 = row.get(2)?;
        let updated_time: Option<String> = row.get(3)?;
        let filters_json: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let modified_at: String = row.get(6)?;

        let Some(status) = SubscriptionStatus::from_code(status_code) else {
            return Ok(Err(StoreError::Corrupt {
                series: series_name,
                reason: format!("unknown status code {}", status_code),
            }));
        };

        let filters: SubscriptionFilters = match serde_json::from_str(&filters_json) {
            Ok(filters) => filters,
            Err(e) => {
                return Ok(Err(StoreError::Corrupt {
                    series: series_name,
                    reason: format!("bad filters: {}", e),
                }))
            }
        };

        Ok(Ok(Subscription {
            series_name,
            status,
            watermark,
            updated_time: parse_optional_timestamp(updated_time),
            filters,
            created_at: parse_timestamp(&created_at),
            modified_at: parse_timestamp(&modified_at),
        }))
    }

    fn write(conn: &Connection, subscription: &Subscription) -> Result<(), StoreError> {
        let filters_json = serde_json::to_string(&subscription.filters)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO subscriptions
                (series_name, status, watermark, updated_time, filters, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(series_name) DO UPDATE SET
                status = excluded.status,
                watermark = excluded.watermark,
                updated_time = excluded.updated_time,
                filters = excluded.filters,
                modified_at = excluded.modified_at",
            params![
                &subscription.series_name,
                subscription.status.code(),
                subscription.watermark,
                subscription.updated_time.map(|t| t.to_rfc3339()),
                &filters_json,
                subscription.created_at.to_rfc3339(),
                subscription.modified_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

const SELECT_COLUMNS: &str =
    "SELECT series_name, status, watermark, updated_time, filters, created_at, modified_at
     FROM subscriptions";

impl SubscriptionStore for SqliteSubscriptionStore {
    fn get(&self, series_name: &str) -> Result<Option<Subscription>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE series_name = ?", SELECT_COLUMNS);

        conn.query_row(&sql, params![series_name], Self::row_to_subscription)
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?
            .transpose()
    }

    fn upsert(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::write(&conn, subscription)
    }

    fn upsert_all(&self, subscriptions: &[Subscription]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for subscription in subscriptions {
            Self::write(&tx, subscription)?;
        }

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>, StoreError> {
        let conn = self.conn()?;

        let (where_clause, code) = match (filter.status, filter.include_deleted) {
            (Some(status), _) => ("WHERE status = ?1", Some(status.code())),
            (None, false) => ("WHERE status != ?1", Some(SubscriptionStatus::Deleted.code())),
            (None, true) => ("", None),
        };
        let sql = format!("{} {} ORDER BY series_name", SELECT_COLUMNS, where_clause);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = match code {
            Some(code) => stmt.query_map(params![code], Self::row_to_subscription),
            None => stmt.query_map([], Self::row_to_subscription),
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut subscriptions = Vec::new();
        for row in rows {
            subscriptions.push(row.map_err(|e| StoreError::Database(e.to_string()))??);
        }
        Ok(subscriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn create_test_store() -> SqliteSubscriptionStore {
        SqliteSubscriptionStore::in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let store = create_test_store();
        let mut sub = Subscription::new("Show A", 3, Utc::now());
        sub.filters.subtitle_groups = vec!["g1".to_string()];
        sub.filters.regex = Some("1080p".to_string());
        store.upsert(&sub).unwrap();

        let loaded = store.get("Show A").unwrap().unwrap();
        assert_eq!(loaded.series_name, "Show A");
        assert_eq!(loaded.watermark, 3);
        assert_eq!(loaded.status, SubscriptionStatus::Followed);
        assert_eq!(loaded.filters, sub.filters);
    }

    #[test]
    fn test_get_is_exact() {
        let store = create_test_store();
        store
            .upsert(&Subscription::new("Show A", 0, Utc::now()))
            .unwrap();

        assert!(store.get("show a").unwrap().is_none());
        assert!(store.get("Show").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces() {
        let store = create_test_store();
        let now = Utc::now();
        let mut sub = Subscription::new("Show A", 3, now);
        store.upsert(&sub).unwrap();

        sub.advance(6, now);
        store.upsert(&sub).unwrap();

        let loaded = store.get("Show A").unwrap().unwrap();
        assert_eq!(loaded.watermark, 6);
        assert_eq!(loaded.status, SubscriptionStatus::Updated);
        assert!(loaded.updated_time.is_some());
    }

    #[test]
    fn test_list_filters() {
        let store = create_test_store();
        let now = Utc::now();

        let followed = Subscription::new("A", 1, now);
        let mut updated = Subscription::new("B", 1, now);
        updated.advance(2, now);
        let mut deleted = Subscription::new("C", 1, now);
        deleted.soft_delete(now);

        for sub in [&followed, &updated, &deleted] {
            store.upsert(sub).unwrap();
        }

        let active: Vec<String> = store
            .list_active()
            .unwrap()
            .into_iter()
            .map(|s| s.series_name)
            .collect();
        assert_eq!(active, vec!["A", "B"]);

        let all = store
            .list(&SubscriptionFilter::new().with_deleted())
            .unwrap();
        assert_eq!(all.len(), 3);

        let only_deleted = store
            .list(&SubscriptionFilter::new().with_status(SubscriptionStatus::Deleted))
            .unwrap();
        assert_eq!(only_deleted.len(), 1);
        assert_eq!(only_deleted[0].series_name, "C");
    }

    #[test]
    fn test_corrupt_status_is_reported() {
        let store = create_test_store();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO subscriptions
                    (series_name, status, watermark, filters, created_at, modified_at)
                 VALUES ('X', 7, 0, '{}', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.get("X"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_upsert_all_is_all_or_nothing() {
        let store = create_test_store();
        let now = Utc::now();
        let a = Subscription::new("A", 1, now);
        let b = Subscription::new("B", 1, now);
        store.upsert_all(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(store.list_active().unwrap().len(), 2);

        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_b BEFORE UPDATE ON subscriptions
                 WHEN NEW.series_name = 'B'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut deleted_a = a;
        deleted_a.soft_delete(now);
        let mut deleted_b = b;
        deleted_b.soft_delete(now);

        assert!(store.upsert_all(&[deleted_a, deleted_b]).is_err());
        assert_eq!(
            store.get("A").unwrap().unwrap().status,
            SubscriptionStatus::Followed
        );
    }

    #[test]
    fn test_file_based_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("subscriptions.db");

        {
            let store = SqliteSubscriptionStore::new(&db_path).unwrap();
            store
                .upsert(&Subscription::new("Show A", 4, Utc::now()))
                .unwrap();
        }

        let store = SqliteSubscriptionStore::new(&db_path).unwrap();
        let loaded = store.get("Show A").unwrap().unwrap();
        assert_eq!(loaded.watermark, 4);
    }
}
