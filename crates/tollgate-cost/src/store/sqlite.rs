// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed counter store.
//!
//! All statements run on the single tokio-rusqlite background thread, and each
//! increment is one `INSERT ... ON CONFLICT DO UPDATE` statement.

use async_trait::async_trait;
use chrono::NaiveDate;
use tollgate_core::{BudgetCounters, BudgetStore, ResetScope, TenantId, TollgateError};
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS budget_counters (
    tenant TEXT NOT NULL,
    day TEXT NOT NULL,
    tokens_used INTEGER NOT NULL DEFAULT 0,
    usd_used REAL NOT NULL DEFAULT 0.0,
    PRIMARY KEY (tenant, day)
)";

/// Convert a tokio-rusqlite error into TollgateError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TollgateError {
    TollgateError::Storage {
        source: Box::new(e),
    }
}

/// Daily counters persisted in a `budget_counters` table.
pub struct SqliteBudgetStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteBudgetStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub async fn open(path: &str) -> Result<Self, TollgateError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| TollgateError::Storage {
                source: Box::new(e),
            })?;
        Self::with_connection(conn).await
    }

    /// Wrap an existing connection and ensure the schema exists.
    pub async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self, TollgateError> {
        conn.call(|conn| {
            conn.execute(SCHEMA, [])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!("budget counter table ready");
        Ok(Self { conn })
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl BudgetStore for SqliteBudgetStore {
    async fn increment(
        &self,
        tenant: &TenantId,
        day: NaiveDate,
        tokens: u64,
        usd: f64,
    ) -> Result<BudgetCounters, TollgateError> {
        let tenant = tenant.as_str().to_string();
        let day = day_key(day);
        let tokens = i64::try_from(tokens).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let (tokens_used, usd_used): (i64, f64) = conn.query_row(
                    "INSERT INTO budget_counters (tenant, day, tokens_used, usd_used) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(tenant, day) DO UPDATE SET \
                     tokens_used = tokens_used + excluded.tokens_used, \
                     usd_used = usd_used + excluded.usd_used \
                     RETURNING tokens_used, usd_used",
                    rusqlite::params![tenant, day, tokens, usd],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(BudgetCounters {
                    tokens_used: tokens_used.max(0) as u64,
                    usd_used,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get(
        &self,
        tenant: &TenantId,
        day: NaiveDate,
    ) -> Result<BudgetCounters, TollgateError> {
        let tenant = tenant.as_str().to_string();
        let day = day_key(day);
        self.conn
            .call(move |conn| {
                let (tokens_used, usd_used): (i64, f64) = conn.query_row(
                    "SELECT COALESCE(SUM(tokens_used), 0), COALESCE(SUM(usd_used), 0.0) \
                     FROM budget_counters WHERE tenant = ?1 AND day = ?2",
                    rusqlite::params![tenant, day],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(BudgetCounters {
                    tokens_used: tokens_used.max(0) as u64,
                    usd_used,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    async fn reset(&self, scope: &ResetScope) -> Result<(), TollgateError> {
        let tenant = match scope {
            ResetScope::Tenant(tenant) => Some(tenant.as_str().to_string()),
            ResetScope::All => None,
        };
        self.conn
            .call(move |conn| {
                match tenant {
                    Some(tenant) => conn.execute(
                        "DELETE FROM budget_counters WHERE tenant = ?1",
                        rusqlite::params![tenant],
                    )?,
                    None => conn.execute("DELETE FROM budget_counters", [])?,
                };
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
