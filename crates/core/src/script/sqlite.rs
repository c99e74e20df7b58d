//! SQLite-backed script registry.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Weekday;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ScriptError, ScriptRegistry, ScriptedSeries};
use crate::storage::parse_optional_timestamp;
use crate::subscription::SubscriptionStatus;

/// SQLite-backed script registry. Published releases are stored as a JSON
/// object keyed by episode number.
pub struct SqliteScriptRegistry {
    conn: Mutex<Connection>,
}

impl SqliteScriptRegistry {
    /// Create a new SQLite script registry, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, ScriptError> {
        let conn = Connection::open(path).map_err(|e| ScriptError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite script registry (useful for testing).
    pub fn in_memory() -> Result<Self, ScriptError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ScriptError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ScriptError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scripted_series (
                name TEXT PRIMARY KEY,
                episode INTEGER NOT NULL DEFAULT 0,
                status INTEGER NOT NULL,
                updated_time TEXT,
                update_day TEXT NOT NULL,
                releases TEXT NOT NULL DEFAULT '{}'
            );
            "#,
        )
        .map_err(|e| ScriptError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ScriptError> {
        self.conn
            .lock()
            .map_err(|_| ScriptError::Database("script registry lock poisoned".to_string()))
    }

    fn row_to_series(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<Result<ScriptedSeries, ScriptError>> {
        let name: String = row.get(0)?;
        let episode: u32 = row.get(1)?;
        let status_code: i64 = row.get(2)?;
        let updated_time: Option<String> = row.get(3)?;
        let update_day: String = row.get(4)?;
        let releases_json: String = row.get(5)?;

        let Some(status) = SubscriptionStatus::from_code(status_code) else {
            return Ok(Err(corrupt(name, format!("unknown status code {}", status_code))));
        };
        let Ok(update_day) = update_day.parse::<Weekday>() else {
            return Ok(Err(corrupt(name, format!("bad update day '{}'", update_day))));
        };
        let releases: BTreeMap<u32, String> = match serde_json::from_str(&releases_json) {
            Ok(releases) => releases,
            Err(e) => return Ok(Err(corrupt(name, format!("bad releases: {}", e)))),
        };

        Ok(Ok(ScriptedSeries {
            name,
            episode,
            status,
            updated_time: parse_optional_timestamp(updated_time),
            update_day,
            releases,
        }))
    }
}

fn corrupt(name: String, reason: String) -> ScriptError {
    ScriptError::Corrupt { name, reason }
}

const SELECT_COLUMNS: &str =
    "SELECT name, episode, status, updated_time, update_day, releases FROM scripted_series";

impl ScriptRegistry for SqliteScriptRegistry {
    fn get(&self, name: &str) -> Result<Option<ScriptedSeries>, ScriptError> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE name = ?", SELECT_COLUMNS);

        conn.query_row(&sql, params![name], Self::row_to_series)
            .optional()
            .map_err(|e| ScriptError::Database(e.to_string()))?
            .transpose()
    }

    fn save(&self, series: &ScriptedSeries) -> Result<(), ScriptError> {
        let conn = self.conn()?;
        let releases_json = serde_json::to_string(&series.releases)
            .map_err(|e| ScriptError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO scripted_series
                (name, episode, status, updated_time, update_day, releases)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                episode = excluded.episode,
                status = excluded.status,
                updated_time = excluded.updated_time,
                update_day = excluded.update_day,
                releases = excluded.releases",
            params![
                &series.name,
                series.episode,
                series.status.code(),
                series.updated_time.map(|t| t.to_rfc3339()),
                series.update_day.to_string(),
                &releases_json,
            ],
        )
        .map_err(|e| ScriptError::Database(e.to_string()))?;

        Ok(())
    }

    fn list(&self) -> Result<Vec<ScriptedSeries>, ScriptError> {
        let conn = self.conn()?;
        let sql = format!("{} ORDER BY name", SELECT_COLUMNS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ScriptError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_series)
            .map_err(|e| ScriptError::Database(e.to_string()))?;

        let mut series = Vec::new();
        for row in rows {
            series.push(row.map_err(|e| ScriptError::Database(e.to_string()))??);
        }
        Ok(series)
    }
}
