//! SQLite-backed download queue.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{DownloadError, DownloadStatus, DownloadTask, Downloader};
use crate::storage::parse_timestamp;

/// SQLite-backed download queue.
///
/// Tasks are unique per `(series_name, episode)`; enqueueing a known pair
/// refreshes its link and resets it to queued.
pub struct SqliteDownloadQueue {
    conn: Mutex<Connection>,
}

impl SqliteDownloadQueue {
    /// Create a new SQLite download queue, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, DownloadError> {
        let conn = Connection::open(path).map_err(|e| DownloadError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite download queue (useful for testing).
    pub fn in_memory() -> Result<Self, DownloadError> {
        let conn =
            Connection::open_in_memory().map_err(|e| DownloadError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DownloadError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS download_tasks (
                id TEXT PRIMARY KEY,
                series_name TEXT NOT NULL,
                episode INTEGER NOT NULL,
                title TEXT NOT NULL,
                download TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(series_name, episode)
            );

            CREATE INDEX IF NOT EXISTS idx_download_tasks_status ON download_tasks(status);
            "#,
        )
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DownloadError> {
        self.conn
            .lock()
            .map_err(|_| DownloadError::Database("download queue lock poisoned".to_string()))
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<DownloadTask> {
        let status: String = row.get(5)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(DownloadTask {
            id: row.get(0)?,
            series_name: row.get(1)?,
            episode: row.get(2)?,
            title: row.get(3)?,
            download: row.get(4)?,
            status: status.parse().unwrap_or(DownloadStatus::Failed),
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn query_tasks(
        conn: &Connection,
        where_clause: &str,
        status: Option<DownloadStatus>,
    ) -> Result<Vec<DownloadTask>, DownloadError> {
        let sql = format!(
            "SELECT id, series_name, episode, title, download, status, created_at, updated_at
             FROM download_tasks {} ORDER BY created_at, series_name, episode",
            where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        let rows = match status {
            Some(status) => stmt.query_map(params![status.as_str()], Self::row_to_task),
            None => stmt.query_map([], Self::row_to_task),
        }
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(|e| DownloadError::Database(e.to_string()))?);
        }
        Ok(tasks)
    }

    fn get_by_id(conn: &Connection, id: &str) -> Result<Option<DownloadTask>, DownloadError> {
        conn.query_row(
            "SELECT id, series_name, episode, title, download, status, created_at, updated_at
             FROM download_tasks WHERE id = ?",
            params![id],
            Self::row_to_task,
        )
        .optional()
        .map_err(|e| DownloadError::Database(e.to_string()))
    }
}

impl Downloader for SqliteDownloadQueue {
    fn enqueue(&self, tasks: &[DownloadTask]) -> Result<usize, DownloadError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        let mut queued = 0;
        for task in tasks {
            let changed = tx
                .execute(
                    "INSERT INTO download_tasks
                        (id, series_name, episode, title, download, status, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(series_name, episode) DO UPDATE SET
                        title = excluded.title,
                        download = excluded.download,
                        status = excluded.status,
                        updated_at = excluded.updated_at",
                    params![
                        &task.id,
                        &task.series_name,
                        task.episode,
                        &task.title,
                        &task.download,
                        DownloadStatus::Queued.as_str(),
                        task.created_at.to_rfc3339(),
                        task.updated_at.to_rfc3339(),
                    ],
                )
                .map_err(|e| DownloadError::Database(e.to_string()))?;
            queued += changed;
        }

        tx.commit()
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        debug!("Enqueued {} download tasks", queued);
        Ok(queued)
    }

    fn get(&self, id: &str) -> Result<Option<DownloadTask>, DownloadError> {
        let conn = self.conn()?;
        Self::get_by_id(&conn, id)
    }

    fn list(&self, status: Option<DownloadStatus>) -> Result<Vec<DownloadTask>, DownloadError> {
        let conn = self.conn()?;
        let where_clause = if status.is_some() {
            "WHERE status = ?1"
        } else {
            ""
        };
        Self::query_tasks(&conn, where_clause, status)
    }

    fn set_status(&self, id: &str, status: DownloadStatus) -> Result<DownloadTask, DownloadError> {
        let conn = self.conn()?;
        let mut task =
            Self::get_by_id(&conn, id)?.ok_or_else(|| DownloadError::NotFound(id.to_string()))?;

        if task.status.is_terminal() && !status.is_terminal() {
            return Err(DownloadError::InvalidTransition {
                id: id.to_string(),
                from: task.status,
                to: status,
            });
        }

        let now = Utc::now();
        conn.execute(
            "UPDATE download_tasks SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), now.to_rfc3339(), id],
        )
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        task.status = status;
        task.updated_at = now;
        Ok(task)
    }

    fn requeue_failed(&self) -> Result<Vec<DownloadTask>, DownloadError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        let failed = Self::query_tasks(&tx, "WHERE status = ?1", Some(DownloadStatus::Failed))?;
        if failed.is_empty() {
            return Ok(failed);
        }

        let now = Utc::now();
        tx.execute(
            "UPDATE download_tasks SET status = ?, updated_at = ? WHERE status = ?",
            params![
                DownloadStatus::Queued.as_str(),
                now.to_rfc3339(),
                DownloadStatus::Failed.as_str()
            ],
        )
        .map_err(|e| DownloadError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| DownloadError::Database(e.to_string()))?;

        Ok(failed
            .into_iter()
            .map(|mut task| {
                task.status = DownloadStatus::Queued;
                task.updated_at = now;
                task
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_queue() -> SqliteDownloadQueue {
        SqliteDownloadQueue::in_memory().unwrap()
    }

    fn create_test_task(series: &str, episode: u32) -> DownloadTask {
        let now = Utc::now();
        DownloadTask {
            id: uuid::Uuid::new_v4().to_string(),
            series_name: series.to_string(),
            episode,
            title: format!("{} - {:02}", series, episode),
            download: format!("magnet:?xt=urn:btih:{}{}", series, episode),
            status: DownloadStatus::Queued,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_enqueue_and_list() {
        let queue = create_test_queue();
        let count = queue
            .enqueue(&[create_test_task("Show A", 1), create_test_task("Show A", 2)])
            .unwrap();
        assert_eq!(count, 2);

        let tasks = queue.list(None).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.status == DownloadStatus::Queued));
    }

    #[test]
    fn test_enqueue_same_episode_resets() {
        let queue = create_test_queue();
        let first = create_test_task("Show A", 1);
        queue.enqueue(std::slice::from_ref(&first)).unwrap();
        queue.set_status(&first.id, DownloadStatus::Failed).unwrap();

        let mut again = create_test_task("Show A", 1);
        again.download = "magnet:?xt=urn:btih:new".to_string();
        queue.enqueue(&[again]).unwrap();

        let tasks = queue.list(None).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, first.id);
        assert_eq!(tasks[0].status, DownloadStatus::Queued);
        assert_eq!(tasks[0].download, "magnet:?xt=urn:btih:new");
    }

    #[test]
    fn test_set_status() {
        let queue = create_test_queue();
        let task = create_test_task("Show A", 1);
        queue.enqueue(std::slice::from_ref(&task)).unwrap();

        let updated = queue.set_status(&task.id, DownloadStatus::Done).unwrap();
        assert_eq!(updated.status, DownloadStatus::Done);

        let done = queue.list(Some(DownloadStatus::Done)).unwrap();
        assert_eq!(done.len(), 1);
        assert!(queue.list(Some(DownloadStatus::Queued)).unwrap().is_empty());
    }

    #[test]
    fn test_finished_task_cannot_go_back_to_work() {
        let queue = create_test_queue();
        let task = create_test_task("Show A", 1);
        queue.enqueue(std::slice::from_ref(&task)).unwrap();
        queue.set_status(&task.id, DownloadStatus::Done).unwrap();

        assert!(matches!(
            queue.set_status(&task.id, DownloadStatus::InProgress),
            Err(DownloadError::InvalidTransition {
                from: DownloadStatus::Done,
                to: DownloadStatus::InProgress,
                ..
            })
        ));
        assert_eq!(
            queue.get(&task.id).unwrap().unwrap().status,
            DownloadStatus::Done
        );

        // terminal to terminal is a correction from the worker
        let failed = queue.set_status(&task.id, DownloadStatus::Failed).unwrap();
        assert_eq!(failed.status, DownloadStatus::Failed);
    }

    #[test]
    fn test_set_status_unknown_task() {
        let queue = create_test_queue();
        assert!(matches!(
            queue.set_status("nope", DownloadStatus::Done),
            Err(DownloadError::NotFound(_))
        ));
    }

    #[test]
    fn test_requeue_failed() {
        let queue = create_test_queue();
        let a = create_test_task("Show A", 1);
        let b = create_test_task("Show A", 2);
        queue.enqueue(&[a.clone(), b.clone()]).unwrap();
        queue.set_status(&a.id, DownloadStatus::Failed).unwrap();
        queue.set_status(&b.id, DownloadStatus::Done).unwrap();

        let requeued = queue.requeue_failed().unwrap();
        assert_eq!(requeued.len(), 1);
        assert_eq!(requeued[0].id, a.id);
        assert_eq!(requeued[0].status, DownloadStatus::Queued);

        assert_eq!(
            queue.get(&a.id).unwrap().unwrap().status,
            DownloadStatus::Queued
        );
        assert!(queue.requeue_failed().unwrap().is_empty());
    }
}
