//! `SQLite`-backed implementation of [`QueueStore`].
//!
//! Uses a single `Mutex<Connection>` for thread safety. The queue,
//! error ledger, run history, and daily aggregates live in one database
//! file so a run's durable footprint is a single local artifact.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::Connection;
use storesync_types::{
    DailyAggregate, ErrorKind, ErrorRecord, ItemStatus, ProductRecord, QueueStats, SyncRun,
    SyncType, TodayStats, TriggerType, WorkItem,
};

use crate::error::{self, StoreError};
use crate::store::{Page, Pagination, QueueFilter, QueueStore};

/// `SQLite` datetime format (UTC, no timezone suffix).
const SQLITE_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Retry budget given to newly admitted items unless overridden.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// ETA fallback when no completed item from the last 24h exists.
const FALLBACK_AVG_DURATION_MS: f64 = 300.0;

/// Cap on rows returned by the recent-error view.
const RECENT_ERRORS_LIMIT: u32 = 50;

/// Idempotent DDL for queue, ledger, history, and aggregate tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    natural_key TEXT NOT NULL UNIQUE,
    display_name TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 3,
    last_error TEXT,
    payload TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    processed_at TEXT,
    sync_type TEXT NOT NULL DEFAULT 'update'
);

CREATE TABLE IF NOT EXISTS sync_errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    natural_key TEXT,
    error_type TEXT NOT NULL,
    error_message TEXT NOT NULL,
    stack_trace TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    resolved INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sync_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id TEXT NOT NULL,
    total_items INTEGER NOT NULL DEFAULT 0,
    successful INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    completed_at TEXT NOT NULL DEFAULT (datetime('now')),
    trigger_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    total_synced INTEGER NOT NULL DEFAULT 0,
    successful INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    avg_duration_ms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_queue_status ON sync_queue (status);
CREATE INDEX IF NOT EXISTS idx_queue_natural_key ON sync_queue (natural_key);
CREATE INDEX IF NOT EXISTS idx_history_batch ON sync_history (batch_id);
CREATE INDEX IF NOT EXISTS idx_stats_date ON sync_stats (date);
CREATE INDEX IF NOT EXISTS idx_errors_resolved ON sync_errors (resolved);
";

const ITEM_COLUMNS: &str = "id, natural_key, display_name, status, attempts, max_attempts, \
     last_error, payload, created_at, updated_at, processed_at, sync_type";

/// `SQLite`-backed queue store.
///
/// Create with [`SqliteStore::open`] for file-backed persistence or
/// [`SqliteStore::in_memory`] for tests.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    max_attempts: u32,
}

impl SqliteStore {
    /// Open or create the queue database at `path`.
    ///
    /// `max_attempts` is the retry budget stamped on newly admitted items.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory can't be created, or
    /// [`StoreError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path, max_attempts: u32) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL keeps the queue crash-safe under a writer plus readers.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(CREATE_TABLES)?;
        tracing::debug!(path = %path.display(), max_attempts, "Opened queue database");
        Ok(Self {
            conn: Mutex::new(conn),
            max_attempts: max_attempts.max(1),
        })
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the in-memory database can't be
    /// initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Convert a `SQLite` datetime string to ISO-8601.
    fn sqlite_to_iso8601(raw: &str) -> String {
        NaiveDateTime::parse_from_str(raw, SQLITE_DATETIME_FMT).map_or_else(
            |_| raw.to_string(),
            |ndt| format!("{}Z", ndt.format("%Y-%m-%dT%H:%M:%S")),
        )
    }

    /// Convert an ISO-8601 string to `SQLite` datetime format.
    fn iso8601_to_sqlite(iso: &str) -> String {
        chrono::DateTime::parse_from_rfc3339(iso).map_or_else(
            |_| iso.to_string(),
            |dt| dt.format(SQLITE_DATETIME_FMT).to_string(),
        )
    }

    fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkItem> {
        let natural_key: String = row.get(1)?;
        let status_raw: String = row.get(3)?;
        let attempts: i64 = row.get(4)?;
        let max_attempts: i64 = row.get(5)?;
        let payload_raw: Option<String> = row.get(7)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;
        let processed_at: Option<String> = row.get(10)?;
        let sync_type_raw: String = row.get(11)?;

        // A payload that no longer decodes degrades to a bare record
        // instead of wedging the queue.
        let payload = payload_raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<ProductRecord>(raw).ok())
            .unwrap_or_else(|| ProductRecord::bare(natural_key.clone()));

        Ok(WorkItem {
            id: row.get(0)?,
            display_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            payload,
            status: ItemStatus::parse(&status_raw).unwrap_or(ItemStatus::Pending),
            attempts: u32::try_from(attempts).unwrap_or(0),
            max_attempts: u32::try_from(max_attempts).unwrap_or(DEFAULT_MAX_ATTEMPTS),
            last_error: row.get(6)?,
            created_at: Self::sqlite_to_iso8601(&created_at),
            updated_at: Self::sqlite_to_iso8601(&updated_at),
            processed_at: processed_at.as_deref().map(Self::sqlite_to_iso8601),
            sync_type: SyncType::parse(&sync_type_raw).unwrap_or(SyncType::Update),
            natural_key,
        })
    }

    fn error_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ErrorRecord> {
        let kind_raw: String = row.get(2)?;
        let created_at: String = row.get(5)?;
        let resolved: i64 = row.get(6)?;
        Ok(ErrorRecord {
            id: row.get(0)?,
            natural_key: row.get(1)?,
            kind: ErrorKind::parse(&kind_raw).unwrap_or(ErrorKind::Processing),
            message: row.get(3)?,
            stack_trace: row.get(4)?,
            created_at: Self::sqlite_to_iso8601(&created_at),
            resolved: resolved != 0,
        })
    }

    fn admit_on(conn: &Connection, record: &ProductRecord, sync_type: SyncType, max_attempts: u32) -> rusqlite::Result<()> {
        // REPLACE drops the old row entirely, so attempts, created_at and
        // any previous error reset along with the payload.
        conn.execute(
            "INSERT OR REPLACE INTO sync_queue \
             (natural_key, display_name, payload, sync_type, status, attempts, max_attempts, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5, datetime('now'))",
            rusqlite::params![
                record.natural_key,
                record.queue_name(),
                serde_json::to_string(record).unwrap_or_default(),
                sync_type.as_str(),
                i64::from(max_attempts),
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn backdate(&self, natural_key: &str, column: &str, sqlite_datetime: &str) {
        let conn = self.lock_conn().unwrap();
        let sql = format!("UPDATE sync_queue SET {column} = ?1 WHERE natural_key = ?2");
        conn.execute(&sql, rusqlite::params![sqlite_datetime, natural_key])
            .unwrap();
    }

    #[cfg(test)]
    fn backdate_error(&self, error_id: i64, sqlite_datetime: &str) {
        let conn = self.lock_conn().unwrap();
        conn.execute(
            "UPDATE sync_errors SET created_at = ?1 WHERE id = ?2",
            rusqlite::params![sqlite_datetime, error_id],
        )
        .unwrap();
    }
}

impl QueueStore for SqliteStore {
    fn admit(&self, record: &ProductRecord, sync_type: SyncType) -> error::Result<()> {
        let conn = self.lock_conn()?;
        Self::admit_on(&conn, record, sync_type, self.max_attempts)?;
        Ok(())
    }

    fn admit_batch(&self, records: &[ProductRecord], sync_type: SyncType) -> error::Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;
        for record in records {
            Self::admit_on(&tx, record, sync_type, self.max_attempts)?;
        }
        tx.commit()?;
        Ok(records.len() as u64)
    }

    fn dequeue_next(&self) -> error::Result<Option<WorkItem>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue \
             WHERE status = 'pending' AND attempts < max_attempts \
             ORDER BY created_at ASC, id ASC LIMIT 1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let result = stmt.query_row([], Self::item_from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn mark_processing(&self, natural_key: &str) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE sync_queue SET status = 'processing', updated_at = datetime('now') \
             WHERE natural_key = ?1",
            [natural_key],
        )?;
        Ok(())
    }

    fn mark_completed(&self, natural_key: &str) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE sync_queue SET status = 'completed', processed_at = datetime('now'), \
             updated_at = datetime('now'), last_error = NULL \
             WHERE natural_key = ?1",
            [natural_key],
        )?;
        Ok(())
    }

    fn mark_failed(&self, natural_key: &str, message: &str) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE sync_queue SET status = 'failed', last_error = ?1, \
             attempts = MIN(attempts + 1, max_attempts), \
             updated_at = datetime('now') \
             WHERE natural_key = ?2",
            rusqlite::params![message, natural_key],
        )?;
        Ok(())
    }

    fn requeue_with_increment(&self, natural_key: &str) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE sync_queue SET attempts = attempts + 1, status = 'pending', \
             updated_at = datetime('now') \
             WHERE natural_key = ?1",
            [natural_key],
        )?;
        Ok(())
    }

    fn page(
        &self,
        filter: &QueueFilter,
        page: u32,
        per_page: u32,
    ) -> error::Result<Page<WorkItem>> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let mut where_clause = String::from("1=1");
        let mut params: Vec<Value> = Vec::new();
        if let Some(status) = filter.status {
            where_clause.push_str(" AND status = ?");
            params.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            where_clause.push_str(" AND (natural_key LIKE ? OR display_name LIKE ?)");
            let pattern = format!("%{search}%");
            params.push(Value::Text(pattern.clone()));
            params.push(Value::Text(pattern));
        }

        let conn = self.lock_conn()?;

        let count_sql = format!("SELECT COUNT(*) FROM sync_queue WHERE {where_clause}");
        let total: i64 = conn.query_row(
            &count_sql,
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        let select_sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue WHERE {where_clause} \
             ORDER BY \
               CASE status \
                 WHEN 'processing' THEN 1 \
                 WHEN 'pending' THEN 2 \
                 WHEN 'failed' THEN 3 \
                 WHEN 'completed' THEN 4 \
               END, \
               updated_at DESC \
             LIMIT ? OFFSET ?"
        );
        // Widen before multiplying: huge page numbers must fall off the
        // end of the data, not overflow.
        let offset = u64::from(page - 1) * u64::from(per_page);
        params.push(Value::Integer(i64::from(per_page)));
        params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&select_sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), Self::item_from_row)?;
        let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        let total = u64::try_from(total).unwrap_or(0);
        Ok(Page {
            data,
            pagination: Pagination {
                page,
                per_page,
                total,
                pages: total.div_ceil(u64::from(per_page)),
            },
        })
    }

    fn stats(&self) -> error::Result<QueueStats> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM sync_queue GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut stats = QueueStats::default();
        for row in rows {
            let (status, count) = row?;
            let count = u64::try_from(count).unwrap_or(0);
            match ItemStatus::parse(&status) {
                Some(ItemStatus::Pending) => stats.pending = count,
                Some(ItemStatus::Processing) => stats.processing = count,
                Some(ItemStatus::Completed) => stats.completed = count,
                Some(ItemStatus::Failed) => stats.failed = count,
                None => continue,
            }
            stats.total += count;
        }
        Ok(stats)
    }

    fn stats_today(&self) -> error::Result<TodayStats> {
        let conn = self.lock_conn()?;
        let (total, completed, failed, pending, processing) = conn.query_row(
            "SELECT COUNT(*), \
               COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN status = 'processing' THEN 1 ELSE 0 END), 0) \
             FROM sync_queue WHERE date(updated_at) = date('now')",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

        let total = u64::try_from(total).unwrap_or(0);
        let completed = u64::try_from(completed).unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total > 0 {
            (completed as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        Ok(TodayStats {
            total,
            completed,
            failed: u64::try_from(failed).unwrap_or(0),
            pending: u64::try_from(pending).unwrap_or(0),
            processing: u64::try_from(processing).unwrap_or(0),
            success_rate,
        })
    }

    fn count_by_status(&self, status: ItemStatus) -> error::Result<u64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn average_recent_duration_ms(&self) -> error::Result<f64> {
        let conn = self.lock_conn()?;
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG((julianday(processed_at) - julianday(created_at)) * 86400000.0) \
             FROM sync_queue \
             WHERE status = 'completed' AND processed_at > datetime('now', '-1 day')",
            [],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(FALLBACK_AVG_DURATION_MS))
    }

    fn failed_items(&self) -> error::Result<Vec<WorkItem>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue \
             WHERE status = 'failed' ORDER BY updated_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::item_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn retry_failed(&self) -> error::Result<u64> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "UPDATE sync_queue SET status = 'pending', attempts = 0, last_error = NULL, \
             updated_at = datetime('now') \
             WHERE status = 'failed'",
            [],
        )?;
        Ok(changed as u64)
    }

    fn retry_single(&self, natural_key: &str) -> error::Result<bool> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "UPDATE sync_queue SET status = 'pending', attempts = 0, last_error = NULL, \
             updated_at = datetime('now') \
             WHERE natural_key = ?1 AND status = 'failed'",
            [natural_key],
        )?;
        Ok(changed > 0)
    }

    fn find_stuck(&self, timeout_minutes: u32) -> error::Result<Vec<WorkItem>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue \
             WHERE status = 'processing' AND updated_at < datetime('now', ?1)"
        );
        let mut stmt = conn.prepare(&sql)?;
        let modifier = format!("-{timeout_minutes} minutes");
        let rows = stmt.query_map([modifier], Self::item_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn reset_stuck(&self, timeout_minutes: u32) -> error::Result<u64> {
        let conn = self.lock_conn()?;
        // Attempts stay untouched: a reaper reset is not a retry.
        let changed = conn.execute(
            "UPDATE sync_queue SET status = 'pending', updated_at = datetime('now') \
             WHERE status = 'processing' AND updated_at < datetime('now', ?1)",
            [format!("-{timeout_minutes} minutes")],
        )?;
        Ok(changed as u64)
    }

    fn purge_completed(&self, older_than_days: u32) -> error::Result<u64> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "DELETE FROM sync_queue \
             WHERE status = 'completed' AND processed_at < datetime('now', ?1)",
            [format!("-{older_than_days} days")],
        )?;
        Ok(changed as u64)
    }

    fn record_error(
        &self,
        natural_key: Option<&str>,
        kind: ErrorKind,
        message: &str,
        stack_trace: Option<&str>,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sync_errors (natural_key, error_type, error_message, stack_trace) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![natural_key, kind.as_str(), message, stack_trace],
        )?;
        Ok(())
    }

    fn recent_errors(&self, hours: u32) -> error::Result<Vec<ErrorRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, natural_key, error_type, error_message, stack_trace, created_at, resolved \
             FROM sync_errors \
             WHERE created_at > datetime('now', ?1) AND resolved = 0 \
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![format!("-{hours} hours"), i64::from(RECENT_ERRORS_LIMIT)],
            Self::error_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn error_breakdown(&self, hours: u32) -> error::Result<BTreeMap<ErrorKind, u64>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT error_type, COUNT(*) FROM sync_errors \
             WHERE created_at > datetime('now', ?1) AND resolved = 0 \
             GROUP BY error_type",
        )?;
        let rows = stmt.query_map([format!("-{hours} hours")], |row| {
            let kind: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((kind, count))
        })?;

        let mut breakdown = BTreeMap::new();
        for row in rows {
            let (kind_raw, count) = row?;
            if let Some(kind) = ErrorKind::parse(&kind_raw) {
                breakdown.insert(kind, u64::try_from(count).unwrap_or(0));
            }
        }
        Ok(breakdown)
    }

    fn mark_error_resolved(&self, error_id: i64) -> error::Result<bool> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "UPDATE sync_errors SET resolved = 1 WHERE id = ?1",
            [error_id],
        )?;
        Ok(changed > 0)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn add_history(
        &self,
        batch_id: &str,
        total: u64,
        successful: u64,
        failed: u64,
        duration_ms: i64,
        started_at: &str,
        trigger_type: TriggerType,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sync_history \
             (batch_id, total_items, successful, failed, duration_ms, started_at, trigger_type) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                batch_id,
                total as i64,
                successful as i64,
                failed as i64,
                duration_ms,
                Self::iso8601_to_sqlite(started_at),
                trigger_type.as_str(),
            ],
        )?;
        Ok(())
    }

    fn history(&self, limit: u32) -> error::Result<Vec<SyncRun>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, batch_id, total_items, successful, failed, duration_ms, \
                    started_at, completed_at, trigger_type \
             FROM sync_history ORDER BY completed_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([i64::from(limit)], |row| {
            let started_at: String = row.get(6)?;
            let completed_at: String = row.get(7)?;
            let trigger_raw: String = row.get(8)?;
            Ok(SyncRun {
                id: row.get(0)?,
                batch_id: row.get(1)?,
                total: u64::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                successful: u64::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
                failed: u64::try_from(row.get::<_, i64>(4)?).unwrap_or(0),
                duration_ms: row.get(5)?,
                started_at: Self::sqlite_to_iso8601(&started_at),
                completed_at: Self::sqlite_to_iso8601(&completed_at),
                trigger_type: TriggerType::parse(&trigger_raw).unwrap_or(TriggerType::Manual),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn accumulate_daily(
        &self,
        date: &str,
        total: u64,
        successful: u64,
        failed: u64,
        avg_duration_ms: i64,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sync_stats (date, total_synced, successful, failed, avg_duration_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(date) DO UPDATE SET \
               total_synced = total_synced + excluded.total_synced, \
               successful = successful + excluded.successful, \
               failed = failed + excluded.failed, \
               avg_duration_ms = (avg_duration_ms + excluded.avg_duration_ms) / 2",
            rusqlite::params![
                date,
                total as i64,
                successful as i64,
                failed as i64,
                avg_duration_ms,
            ],
        )?;
        Ok(())
    }

    fn last_seven_days(&self) -> error::Result<Vec<DailyAggregate>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT date, total_synced, successful, failed, avg_duration_ms \
             FROM sync_stats WHERE date >= date('now', '-7 days') ORDER BY date ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DailyAggregate {
                date: row.get(0)?,
                total_synced: u64::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
                successful: u64::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                failed: u64::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
                avg_duration_ms: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
