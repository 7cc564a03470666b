//! Confirmation window backed by SQLite.
//!
//! A location is locked for a date once it has a live confirmation row for
//! the period containing that date.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use timesheet_core::{ConfirmationWindow, OperationContext};
use timesheet_domain::{ConfirmationPeriod, Result as DomainResult};
use tokio::task;

use super::codec::{decode_date, encode_date};
use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteConfirmationWindow {
    db: Arc<DbManager>,
}

impl SqliteConfirmationWindow {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

// ISO dates compare correctly as text.
const PERIOD_FOR_DATE_SQL: &str = "SELECT id, start_date, end_date
    FROM timesheet_confirmation_period
    WHERE deleted_at IS NULL AND start_date <= ?1 AND end_date >= ?1
    ORDER BY start_date DESC
    LIMIT 1";

const LOCKED_SQL: &str = "SELECT EXISTS(
        SELECT 1
        FROM timesheet_confirmation_info info
        JOIN timesheet_confirmation_period period ON period.id = info.period_id
        WHERE info.deleted_at IS NULL
          AND period.deleted_at IS NULL
          AND info.location_id = ?2
          AND period.start_date <= ?1
          AND period.end_date >= ?1
    )";

#[async_trait]
impl ConfirmationWindow for SqliteConfirmationWindow {
    async fn confirmation_period(
        &self,
        _ctx: &OperationContext,
        date: NaiveDate,
    ) -> DomainResult<Option<ConfirmationPeriod>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Option<ConfirmationPeriod>> {
            let conn = db.get_connection()?;
            let period = conn
                .query_row(PERIOD_FOR_DATE_SQL, params![encode_date(date)], |row| {
                    let start: String = row.get(1)?;
                    let end: String = row.get(2)?;
                    Ok(ConfirmationPeriod {
                        id: row.get(0)?,
                        start_date: decode_date(1, &start)?,
                        end_date: decode_date(2, &end)?,
                    })
                })
                .optional()
                .map_err(InfraError::from)?;
            Ok(period)
        })
        .await
        .map_err(InfraError::from)?
    }

    async fn is_period_locked(
        &self,
        _ctx: &OperationContext,
        date: NaiveDate,
        location_id: &str,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let location_id = location_id.to_string();
        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let locked = conn
                .query_row(LOCKED_SQL, params![encode_date(date), location_id], |row| row.get(0))
                .map_err(InfraError::from)?;
            Ok(locked)
        })
        .await
        .map_err(InfraError::from)?
    }
}
