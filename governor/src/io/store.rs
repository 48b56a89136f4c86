//! `SQLite`-backed store for quota counters, restriction records, and the
//! blacklist ledger.
//!
//! The database file is the sole source of truth: every lookup rereads it, so
//! records survive process restarts and multiple worker processes may share
//! one file. The one place true concurrent-access discipline matters is
//! [`Store::check_and_consume`], which runs its read and increment inside a
//! single `BEGIN IMMEDIATE` transaction so two workers can never both observe
//! "under limit" and both proceed past it.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use thiserror::Error;
use tracing::debug;

use crate::config::QuotaLimit;
use crate::core::types::{ActionKind, QuotaDecision};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Storage-layer failure. Callers must abort the current attempt rather than
/// guess eligibility when they see this.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One row of the blacklist ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub username: String,
    pub campaign: String,
    pub action: String,
    pub timestamp: String,
}

/// Handle to the governor's persistent tables.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the store at `path`, applying the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Quota gate: decide whether an action of `kind` may run now, and if so,
    /// consume one unit of budget. The decision and the increment commit
    /// together or not at all.
    ///
    /// `None` for `limit` means the kind is unconfigured: unconditional
    /// `Proceed`, nothing written.
    pub fn check_and_consume(
        &self,
        profile_id: &str,
        kind: ActionKind,
        limit: Option<&QuotaLimit>,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, StoreError> {
        let Some(limit) = limit else {
            return Ok(QuotaDecision::Proceed);
        };
        let window_start = window_start(now, limit.window_secs);

        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let count: u32 = tx
            .query_row(
                "SELECT count FROM quota_counters
                 WHERE profile_id = ?1 AND action_kind = ?2 AND window_start = ?3",
                params![profile_id, kind.as_str(), window_start],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        if count >= limit.limit {
            debug!(kind = kind.as_str(), count, limit = limit.limit, "quota exhausted, jumping");
            return Ok(QuotaDecision::Jump);
        }
        tx.execute(
            "INSERT INTO quota_counters (profile_id, action_kind, window_start, count)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT (profile_id, action_kind, window_start)
             DO UPDATE SET count = count + 1",
            params![profile_id, kind.as_str(), window_start],
        )?;
        tx.commit()?;
        Ok(QuotaDecision::Proceed)
    }

    /// Usage count for the current window (0 when no row exists).
    pub fn quota_usage(
        &self,
        profile_id: &str,
        kind: ActionKind,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let window_start = window_start(now, window_secs);
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count: Option<u32> = conn
            .query_row(
                "SELECT count FROM quota_counters
                 WHERE profile_id = ?1 AND action_kind = ?2 AND window_start = ?3",
                params![profile_id, kind.as_str(), window_start],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// How many times this profile has acted on `username` (0 when absent).
    pub fn times_acted(&self, profile_id: &str, username: &str) -> Result<u32, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let times: Option<u32> = conn
            .query_row(
                "SELECT times FROM restriction WHERE profile_id = ?1 AND username = ?2",
                params![profile_id, username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(times.unwrap_or(0))
    }

    /// Whether `username` may still be acted on given a per-target `limit`.
    /// Absence of a record is always eligible.
    pub fn is_eligible(
        &self,
        profile_id: &str,
        username: &str,
        limit: u32,
    ) -> Result<bool, StoreError> {
        Ok(self.times_acted(profile_id, username)? < limit)
    }

    /// Upsert after a verified success: insert with `times = 1`, else
    /// increment. Also refreshes the last-acted timestamp.
    pub fn record_success(
        &self,
        profile_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO restriction (profile_id, username, times, last_acted)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT (profile_id, username)
             DO UPDATE SET times = times + 1, last_acted = ?3",
            params![profile_id, username, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Append one verified action to the blacklist ledger. Never reads prior
    /// state; idempotency is the caller's job (the governor invokes this at
    /// most once per verified attempt).
    pub fn blacklist_add(
        &self,
        username: &str,
        campaign: &str,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO blacklist (username, campaign, action, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, campaign, kind.logged_as(), now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// All ledger rows for a campaign, oldest first.
    pub fn blacklist_entries(&self, campaign: &str) -> Result<Vec<BlacklistEntry>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT username, campaign, action, timestamp FROM blacklist
             WHERE campaign = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![campaign], |row| {
                Ok(BlacklistEntry {
                    username: row.get(0)?,
                    campaign: row.get(1)?,
                    action: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Fixed windows aligned to the epoch: the counter resets exactly at the
/// window boundary. Config validation rejects zero windows, but the store is
/// callable with a raw limit; a zero window degenerates to one window per
/// second rather than panicking.
fn window_start(now: DateTime<Utc>, window_secs: u64) -> i64 {
    let ts = now.timestamp();
    if window_secs == 0 {
        return ts;
    }
    let window = window_secs as i64;
    ts - ts.rem_euclid(window)
}
