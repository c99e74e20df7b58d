//! SQLite-backed series catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::{CatalogError, CatalogStats, Series, SeriesCatalog, SubtitleGroup};
use crate::episode::{Episode, EpisodeSearch, EpisodeSource, SourceError};
use crate::storage::{parse_optional_timestamp, parse_timestamp};

/// Number of episode rows that make up one page.
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default age after which observed rows count as old.
const DEFAULT_IGNORE_OLD_DAYS: u32 = 30;

/// SQLite-backed series catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    page_size: u32,
    ignore_old_days: u32,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, CatalogError> {
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            page_size: DEFAULT_PAGE_SIZE,
            ignore_old_days: DEFAULT_IGNORE_OLD_DAYS,
        })
    }

    /// Set the age after which rows are skipped when old rows are ignored.
    pub fn with_ignore_old_days(mut self, days: u32) -> Self {
        self.ignore_old_days = days;
        self
    }

    /// Set the number of rows per page.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS series (
                name TEXT PRIMARY KEY,
                update_day TEXT NOT NULL,
                first_seen_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subtitle_groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS series_subtitle_groups (
                series_name TEXT NOT NULL REFERENCES series(name) ON DELETE CASCADE,
                group_id TEXT NOT NULL REFERENCES subtitle_groups(id),
                UNIQUE(series_name, group_id)
            );

            -- Observed episodes (one row per release)
            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                series_name TEXT NOT NULL REFERENCES series(name) ON DELETE CASCADE,
                episode INTEGER NOT NULL,
                title TEXT NOT NULL,
                subtitle_group TEXT,
                download TEXT NOT NULL,
                observed_at TEXT NOT NULL,
                UNIQUE(series_name, download)
            );

            CREATE INDEX IF NOT EXISTS idx_episodes_series ON episodes(series_name, episode);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    /// Load subtitle groups for a series.
    fn load_groups(
        conn: &Connection,
        series_name: &str,
    ) -> Result<Vec<SubtitleGroup>, CatalogError> {
        let mut stmt = conn
            .prepare(
                "SELECT sg.id, sg.name FROM subtitle_groups sg
                 JOIN series_subtitle_groups ssg ON ssg.group_id = sg.id
                 WHERE ssg.series_name = ?
                 ORDER BY sg.name",
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![series_name], |row| {
                Ok(SubtitleGroup {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(groups)
    }

    fn load_series(conn: &Connection, name: &str) -> Result<Series, CatalogError> {
        let update_day: String = conn
            .query_row(
                "SELECT update_day FROM series WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => CatalogError::NotFound(name.to_string()),
                _ => CatalogError::Database(e.to_string()),
            })?;

        let update_day = update_day
            .parse()
            .map_err(|_| CatalogError::Internal(format!("bad update day '{}'", update_day)))?;

        Ok(Series {
            name: name.to_string(),
            subtitle_groups: Self::load_groups(conn, name)?,
            update_day,
        })
    }

    fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
        let observed_at: String = row.get(5)?;
        Ok(Episode {
            series_name: row.get(0)?,
            episode: row.get(1)?,
            title: row.get(2)?,
            subtitle_group: row.get(3)?,
            download: row.get(4)?,
            observed_at: parse_timestamp(&observed_at),
        })
    }

    /// Load the most recent `limit` episodes matching a WHERE clause, returned
    /// in the order they were observed.
    fn load_recent(
        &self,
        where_clause: &str,
        arg: &str,
        limit: u32,
    ) -> Result<Vec<Episode>, CatalogError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT series_name, episode, title, subtitle_group, download, observed_at
             FROM episodes WHERE {} ORDER BY id DESC LIMIT ?2",
            where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![arg, limit], Self::row_to_episode)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        episodes.reverse();
        Ok(episodes)
    }

    fn page_limit(&self, max_pages: u32) -> u32 {
        max_pages.max(1).saturating_mul(self.page_size)
    }

    fn fetch_series_episodes(
        &self,
        series: &Series,
        ignore_old: bool,
        max_pages: u32,
    ) -> Result<Vec<Episode>, CatalogError> {
        let mut episodes =
            self.load_recent("series_name = ?1", &series.name, self.page_limit(max_pages))?;

        if ignore_old {
            let cutoff = Utc::now() - Duration::days(i64::from(self.ignore_old_days));
            episodes.retain(|e| e.observed_at >= cutoff);
        }

        debug!(
            "Loaded {} episodes for {} (ignore_old: {}, max_pages: {})",
            episodes.len(),
            series.name,
            ignore_old,
            max_pages
        );
        Ok(episodes)
    }

    fn search_episodes(&self, query: &EpisodeSearch) -> Result<Vec<Episode>, CatalogError> {
        let limit = self.page_limit(query.max_pages);

        if !query.tag {
            return self.load_recent(
                "instr(lower(title), lower(?1)) > 0",
                &query.keyword,
                limit,
            );
        }

        let mut episodes = self.load_recent(
            "instr(lower(series_name), lower(?1)) > 0",
            &query.keyword,
            limit,
        )?;

        if let Some(ref subtitle) = query.subtitle {
            let wanted: Vec<String> = subtitle
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !wanted.is_empty() {
                let group_ids = self.group_ids_by_name(&wanted)?;
                episodes.retain(|e| {
                    e.subtitle_group
                        .as_ref()
                        .is_some_and(|g| group_ids.contains(g))
                });
            }
        }

        Ok(episodes)
    }

    fn group_ids_by_name(&self, lowercase_names: &[String]) -> Result<Vec<String>, CatalogError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM subtitle_groups")
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut ids = Vec::new();
        for row in rows {
            let (id, name) = row.map_err(|e| CatalogError::Database(e.to_string()))?;
            if lowercase_names.contains(&name.to_lowercase()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

impl SeriesCatalog for SqliteCatalog {
    fn resolve(&self, fragment: &str) -> Result<Series, CatalogError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(CatalogError::NotFound(fragment.to_string()));
        }

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM series WHERE instr(lower(name), lower(?)) > 0 ORDER BY name",
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![fragment], |row| row.get::<_, String>(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut matches = Vec::new();
        for row in rows {
            matches.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }

        let name = match matches.iter().find(|m| m.eq_ignore_ascii_case(fragment)) {
            Some(exact) => exact.clone(),
            None => match matches.len() {
                0 => return Err(CatalogError::NotFound(fragment.to_string())),
                1 => matches.remove(0),
                _ => {
                    return Err(CatalogError::Ambiguous {
                        fragment: fragment.to_string(),
                        matches,
                    })
                }
            },
        };

        Self::load_series(&conn, &name)
    }

    fn get(&self, name: &str) -> Result<Series, CatalogError> {
        let conn = self.conn()?;
        Self::load_series(&conn, name)
    }

    fn list(&self) -> Result<Vec<Series>, CatalogError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT name FROM series ORDER BY name")
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        names
            .iter()
            .map(|name| Self::load_series(&conn, name))
            .collect()
    }

    fn max_known_episode(&self, name: &str) -> Result<u32, CatalogError> {
        let conn = self.conn()?;
        let max: Option<u32> = conn
            .query_row(
                "SELECT MAX(episode) FROM episodes WHERE series_name = ?",
                params![name],
                |row| row.get(0),
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(max.unwrap_or(0))
    }

    fn store_series(&self, series: &[Series]) -> Result<u32, CatalogError> {
        let mut conn = self.conn()?;
        let now_str = Utc::now().to_rfc3339();
        let mut new_count = 0;

        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        for entry in series {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM series WHERE name = ?",
                    params![&entry.name],
                    |_| Ok(()),
                )
                .optional()
                .map_err(|e| CatalogError::Database(e.to_string()))?
                .is_some();

            if exists {
                tx.execute(
                    "UPDATE series SET update_day = ?, updated_at = ? WHERE name = ?",
                    params![entry.update_day.to_string(), &now_str, &entry.name],
                )
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            } else {
                tx.execute(
                    "INSERT INTO series (name, update_day, first_seen_at, updated_at)
                     VALUES (?, ?, ?, ?)",
                    params![&entry.name, entry.update_day.to_string(), &now_str, &now_str],
                )
                .map_err(|e| CatalogError::Database(e.to_string()))?;
                new_count += 1;
            }

            // Replace the series' group links with the incoming set
            tx.execute(
                "DELETE FROM series_subtitle_groups WHERE series_name = ?",
                params![&entry.name],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

            for group in &entry.subtitle_groups {
                tx.execute(
                    "INSERT INTO subtitle_groups (id, name) VALUES (?, ?)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                    params![&group.id, &group.name],
                )
                .map_err(|e| CatalogError::Database(e.to_string()))?;

                tx.execute(
                    "INSERT OR IGNORE INTO series_subtitle_groups (series_name, group_id)
                     VALUES (?, ?)",
                    params![&entry.name, &group.id],
                )
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(new_count)
    }

    fn store_episodes(&self, episodes: &[Episode]) -> Result<u32, CatalogError> {
        let mut conn = self.conn()?;
        let mut new_count = 0;

        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        for episode in episodes {
            let known = tx
                .query_row(
                    "SELECT 1 FROM series WHERE name = ?",
                    params![&episode.series_name],
                    |_| Ok(()),
                )
                .optional()
                .map_err(|e| CatalogError::Database(e.to_string()))?
                .is_some();

            if !known {
                warn!(
                    "Skipping episode {} of unknown series {}",
                    episode.episode, episode.series_name
                );
                continue;
            }

            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO episodes
                        (series_name, episode, title, subtitle_group, download, observed_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        &episode.series_name,
                        episode.episode,
                        &episode.title,
                        &episode.subtitle_group,
                        &episode.download,
                        episode.observed_at.to_rfc3339(),
                    ],
                )
                .map_err(|e| CatalogError::Database(e.to_string()))?;

            new_count += inserted as u32;
        }

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(new_count)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.conn()?;

        let total_series: u64 = conn
            .query_row("SELECT COUNT(*) FROM series", [], |row| row.get(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let total_episodes: u64 = conn
            .query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let total_subtitle_groups: u64 = conn
            .query_row("SELECT COUNT(*) FROM subtitle_groups", [], |row| row.get(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let newest_episode_at = conn
            .query_row("SELECT MAX(observed_at) FROM episodes", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(CatalogStats {
            total_series,
            total_episodes,
            total_subtitle_groups,
            newest_episode_at: parse_optional_timestamp(newest_episode_at),
        })
    }
}

#[async_trait]
impl EpisodeSource for SqliteCatalog {
    fn name(&self) -> &str {
        "sqlite-catalog"
    }

    async fn fetch_episodes(
        &self,
        series: &Series,
        ignore_old: bool,
        max_pages: u32,
    ) -> Result<Vec<Episode>, SourceError> {
        self.fetch_series_episodes(series, ignore_old, max_pages)
            .map_err(|e| SourceError::Internal(e.to_string()))
    }

    async fn search(&self, query: &EpisodeSearch) -> Result<Vec<Episode>, SourceError> {
        self.search_episodes(query)
            .map_err(|e| SourceError::Internal(e.to_string()))
    }
}
