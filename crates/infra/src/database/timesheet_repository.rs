//! SQLite-backed timesheet repository.
//!
//! Implements the read port and the three write ports used by lesson
//! reconciliation, direct edits and lifecycle transitions. Every write runs
//! in one transaction on the blocking pool and checks the caller's context
//! right before commit, so a cancelled operation leaves nothing behind.
//! Rows are never removed; `deleted_at` marks them as gone.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use timesheet_core::{
    into_publish_error, LessonHoursFlagUpdate, LessonLockPublisher, LifecycleWriter,
    OperationContext, ReconciliationWriter, TimesheetChangeSet, TimesheetCommandWriter,
    TimesheetLoadOptions, TimesheetLookup, TimesheetReader,
};
use timesheet_domain::{
    LessonHours, LessonLockEvent, OtherWorkingHours, Result as DomainResult, Timesheet, TimesheetError,
    TimesheetStatus, TransportationExpense,
};
use tokio::runtime::Handle;
use tokio::task;
use tracing::{debug, instrument};

use super::codec::{
    bool_to_int, decode_date, decode_enum, decode_instant, encode_date, placeholders,
};
use super::manager::DbManager;
use crate::errors::InfraError;

/// Timesheet aggregate repository backed by the shared SQLite pool.
pub struct SqliteTimesheetRepository {
    db: Arc<DbManager>,
}

impl SqliteTimesheetRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn query(
        &self,
        filter: String,
        values: Vec<Value>,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Vec<Timesheet>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Vec<Timesheet>> {
            let conn = db.get_connection()?;
            load_timesheets(&conn, &filter, values, options)
        })
        .await
        .map_err(InfraError::from)?
    }

    /// Run `work` inside a transaction stamped with the context's clock.
    async fn write<F>(&self, ctx: &OperationContext, work: F) -> DomainResult<()>
    where
        F: FnOnce(&Transaction<'_>, i64) -> DomainResult<()> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();
        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(InfraError::from)?;
            work(&tx, ctx.now().timestamp())?;
            ctx.ensure_active()?;
            tx.commit().map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(InfraError::from)?
    }
}

#[async_trait]
impl TimesheetReader for SqliteTimesheetRepository {
    async fn find_by_id(
        &self,
        _ctx: &OperationContext,
        id: &str,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Option<Timesheet>> {
        let found = self
            .query("timesheet_id = ?".to_string(), vec![Value::Text(id.to_string())], options)
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_by_ids_with_status(
        &self,
        _ctx: &OperationContext,
        ids: &[String],
        status: TimesheetStatus,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Vec<Timesheet>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter =
            format!("timesheet_status = ? AND timesheet_id IN ({})", placeholders(ids.len()));
        let mut values = vec![Value::Text(status.as_str().to_string())];
        values.extend(text_values(ids));
        self.query(filter, values, options).await
    }

    async fn find_by_lookup(
        &self,
        _ctx: &OperationContext,
        lookup: &TimesheetLookup,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Vec<Timesheet>> {
        if lookup.staff_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = format!(
            "location_id = ? AND timesheet_date = ? AND staff_id IN ({})",
            placeholders(lookup.staff_ids.len())
        );
        let mut values = vec![
            Value::Text(lookup.location_id.clone()),
            Value::Text(encode_date(lookup.date)),
        ];
        values.extend(text_values(&lookup.staff_ids));
        self.query(filter, values, options).await
    }

    async fn find_by_lesson_ids(
        &self,
        _ctx: &OperationContext,
        lesson_ids: &[String],
    ) -> DomainResult<Vec<Timesheet>> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = format!(
            "timesheet_id IN (SELECT timesheet_id FROM timesheet_lesson_hours
                WHERE deleted_at IS NULL AND lesson_id IN ({}))",
            placeholders(lesson_ids.len())
        );
        self.query(filter, text_values(lesson_ids).collect(), TimesheetLoadOptions::ALL).await
    }
}

#[async_trait]
impl ReconciliationWriter for SqliteTimesheetRepository {
    #[instrument(skip_all, fields(upserts = changes.upserts.len(), removals = changes.removals.len()))]
    async fn apply_changes(
        &self,
        ctx: &OperationContext,
        changes: &TimesheetChangeSet,
    ) -> DomainResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let changes = changes.clone();
        self.write(ctx, move |tx, now| {
            for timesheet in &changes.upserts {
                if timesheet.is_created {
                    let added = timesheet
                        .lesson_hours
                        .iter()
                        .filter(|lh| !lh.is_created && lh.is_live());
                    for lh in added {
                        insert_lesson_hours(tx, &timesheet.id, lh, now)?;
                    }
                    touch_timesheet(tx, &timesheet.id, now)?;
                } else {
                    insert_timesheet_rows(tx, timesheet, now)?;
                }
            }

            for timesheet in &changes.removals {
                for lh in timesheet.lesson_hours.iter().filter(|lh| lh.is_deleted) {
                    tx.execute(
                        "UPDATE timesheet_lesson_hours SET deleted_at = ?1, updated_at = ?1
                         WHERE timesheet_id = ?2 AND lesson_id = ?3 AND deleted_at IS NULL",
                        params![now, timesheet.id, lh.lesson_id],
                    )
                    .map_err(InfraError::from)?;
                }
                if timesheet.is_deleted {
                    soft_delete_rows(tx, &timesheet.id, true, now)?;
                } else {
                    touch_timesheet(tx, &timesheet.id, now)?;
                }
            }
            Ok(())
        })
        .await?;

        debug!("Applied reconciliation change set");
        Ok(())
    }

    async fn update_lesson_hours_flags(
        &self,
        ctx: &OperationContext,
        updates: &[LessonHoursFlagUpdate],
    ) -> DomainResult<()> {
        let updates = updates.to_vec();
        self.write(ctx, move |tx, now| {
            let mut stmt = tx
                .prepare(
                    "UPDATE timesheet_lesson_hours SET flag_on = ?1, updated_at = ?2
                     WHERE timesheet_id = ?3 AND deleted_at IS NULL",
                )
                .map_err(InfraError::from)?;
            for update in &updates {
                let flag_on = bool_to_int(update.flag_on);
                for timesheet_id in &update.timesheet_ids {
                    stmt.execute(params![flag_on, now, timesheet_id]).map_err(InfraError::from)?;
                }
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TimesheetCommandWriter for SqliteTimesheetRepository {
    async fn insert_timesheet(&self, ctx: &OperationContext, timesheet: &Timesheet) -> DomainResult<()> {
        let timesheet = timesheet.clone();
        self.write(ctx, move |tx, now| insert_timesheet_rows(tx, &timesheet, now)).await
    }

    async fn save_details(&self, ctx: &OperationContext, timesheet: &Timesheet) -> DomainResult<()> {
        let timesheet = timesheet.clone();
        self.write(ctx, move |tx, now| {
            let changed = tx
                .execute(
                    "UPDATE timesheet SET remark = ?1, updated_at = ?2
                     WHERE timesheet_id = ?3 AND deleted_at IS NULL",
                    params![timesheet.remark, now, timesheet.id],
                )
                .map_err(InfraError::from)?;
            if changed == 0 {
                return Err(TimesheetError::NotFound(format!("timesheet {}", timesheet.id)));
            }

            for owh in &timesheet.other_working_hours {
                if owh.is_deleted {
                    tx.execute(
                        "UPDATE other_working_hours SET deleted_at = ?1, updated_at = ?1
                         WHERE other_working_hours_id = ?2 AND timesheet_id = ?3",
                        params![now, owh.id, timesheet.id],
                    )
                    .map_err(InfraError::from)?;
                } else {
                    upsert_other_working_hours(tx, &timesheet.id, owh, now)?;
                }
            }

            for expense in &timesheet.transportation_expenses {
                if expense.is_deleted {
                    tx.execute(
                        "UPDATE transportation_expense SET deleted_at = ?1, updated_at = ?1
                         WHERE transportation_expense_id = ?2 AND timesheet_id = ?3",
                        params![now, expense.id, timesheet.id],
                    )
                    .map_err(InfraError::from)?;
                } else {
                    upsert_transportation_expense(tx, &timesheet.id, expense, now)?;
                }
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl LifecycleWriter for SqliteTimesheetRepository {
    async fn soft_delete(
        &self,
        ctx: &OperationContext,
        timesheet_id: &str,
        delete_timesheet: bool,
    ) -> DomainResult<()> {
        let timesheet_id = timesheet_id.to_string();
        self.write(ctx, move |tx, now| {
            let live: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM timesheet WHERE timesheet_id = ?1 AND deleted_at IS NULL)",
                    params![timesheet_id],
                    |row| row.get(0),
                )
                .map_err(InfraError::from)?;
            if !live {
                return Err(TimesheetError::NotFound(format!("timesheet {timesheet_id}")));
            }
            soft_delete_rows(tx, &timesheet_id, delete_timesheet, now)
        })
        .await
    }

    #[instrument(skip_all, fields(count = ids.len(), %from, %to))]
    async fn transition_status(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        from: TimesheetStatus,
        to: TimesheetStatus,
    ) -> DomainResult<()> {
        let ids = ids.to_vec();
        self.write(ctx, move |tx, now| transition_rows(tx, &ids, from, to, now)).await
    }

    #[instrument(skip_all, fields(count = ids.len(), locked = lock.lesson_ids.len()))]
    async fn approve_with_lock(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        lock: &LessonLockEvent,
        publisher: Arc<dyn LessonLockPublisher>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();
        let ids = ids.to_vec();
        let lock = lock.clone();
        let runtime = Handle::current();
        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(InfraError::from)?;
            let from = TimesheetStatus::Submitted;
            transition_rows(&tx, &ids, from, TimesheetStatus::Approved, ctx.now().timestamp())?;
            ctx.ensure_active()?;
            if !lock.lesson_ids.is_empty() {
                // Dropping the transaction on failure rolls the approval back.
                runtime
                    .block_on(publisher.publish_lesson_lock(&ctx, &lock))
                    .map_err(into_publish_error)?;
                debug!(lessons = lock.lesson_ids.len(), "Lesson lock published");
            }
            tx.commit().map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(InfraError::from)?
    }
}

/// Move every ID from `from` to `to`; any row not in `from` is a conflict.
fn transition_rows(
    tx: &Transaction<'_>,
    ids: &[String],
    from: TimesheetStatus,
    to: TimesheetStatus,
    now: i64,
) -> DomainResult<()> {
    let mut stmt = tx
        .prepare(
            "UPDATE timesheet SET timesheet_status = ?1, updated_at = ?2
             WHERE timesheet_id = ?3 AND timesheet_status = ?4 AND deleted_at IS NULL",
        )
        .map_err(InfraError::from)?;
    for id in ids {
        let changed =
            stmt.execute(params![to.as_str(), now, id, from.as_str()]).map_err(InfraError::from)?;
        if changed != 1 {
            return Err(TimesheetError::Conflict(format!("timesheet {id} is not {from}")));
        }
    }
    Ok(())
}

// =============================================================================
// Queries
// =============================================================================

const SELECT_TIMESHEET_SQL: &str = "SELECT timesheet_id, staff_id, location_id, timesheet_date,
        timesheet_status, remark
    FROM timesheet
    WHERE deleted_at IS NULL";

const SELECT_LESSON_HOURS_SQL: &str = "SELECT timesheet_id, lesson_id, flag_on
    FROM timesheet_lesson_hours
    WHERE deleted_at IS NULL AND timesheet_id IN ({ids})
    ORDER BY created_at, lesson_id";

const SELECT_OTHER_WORKING_HOURS_SQL: &str = "SELECT other_working_hours_id, timesheet_id,
        timesheet_config_id, start_time, end_time, total_minutes, remarks
    FROM other_working_hours
    WHERE deleted_at IS NULL AND timesheet_id IN ({ids})
    ORDER BY start_time, other_working_hours_id";

const SELECT_TRANSPORTATION_EXPENSE_SQL: &str = "SELECT transportation_expense_id, timesheet_id,
        transportation_type, transportation_from, transportation_to, cost_amount,
        round_trip, remarks
    FROM transportation_expense
    WHERE deleted_at IS NULL AND timesheet_id IN ({ids})
    ORDER BY created_at, transportation_expense_id";

fn text_values(values: &[String]) -> impl Iterator<Item = Value> + '_ {
    values.iter().map(|v| Value::Text(v.clone()))
}

fn load_timesheets(
    conn: &Connection,
    filter: &str,
    values: Vec<Value>,
    options: TimesheetLoadOptions,
) -> DomainResult<Vec<Timesheet>> {
    let sql = format!("{SELECT_TIMESHEET_SQL} AND ({filter}) ORDER BY timesheet_date, staff_id");
    let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
    let mut timesheets = stmt
        .query_map(params_from_iter(values), map_timesheet_row)
        .map_err(InfraError::from)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(InfraError::from)?;

    if timesheets.is_empty() {
        return Ok(timesheets);
    }
    let ids: Vec<String> = timesheets.iter().map(|ts| ts.id.clone()).collect();

    if options.lesson_hours {
        let mut by_owner = load_children(conn, SELECT_LESSON_HOURS_SQL, &ids, map_lesson_hours_row)?;
        for ts in &mut timesheets {
            ts.lesson_hours = by_owner.remove(&ts.id).unwrap_or_default();
        }
    }
    if options.other_working_hours {
        let mut by_owner =
            load_children(conn, SELECT_OTHER_WORKING_HOURS_SQL, &ids, map_other_working_hours_row)?;
        for ts in &mut timesheets {
            ts.other_working_hours = by_owner.remove(&ts.id).unwrap_or_default();
        }
    }
    if options.transportation_expenses {
        let mut by_owner = load_children(
            conn,
            SELECT_TRANSPORTATION_EXPENSE_SQL,
            &ids,
            map_transportation_expense_row,
        )?;
        for ts in &mut timesheets {
            ts.transportation_expenses = by_owner.remove(&ts.id).unwrap_or_default();
        }
    }
    Ok(timesheets)
}

/// Load rows owned by `ids`, grouped by owning timesheet ID.
fn load_children<T, F>(
    conn: &Connection,
    template: &str,
    ids: &[String],
    map: F,
) -> DomainResult<HashMap<String, Vec<T>>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<(String, T)>,
{
    let sql = template.replace("{ids}", &placeholders(ids.len()));
    let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), map).map_err(InfraError::from)?;

    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        let (owner, child) = row.map_err(InfraError::from)?;
        grouped.entry(owner).or_default().push(child);
    }
    Ok(grouped)
}

fn map_timesheet_row(row: &Row<'_>) -> rusqlite::Result<Timesheet> {
    let date: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(Timesheet {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        location_id: row.get(2)?,
        date: decode_date(3, &date)?,
        status: decode_enum(4, &status)?,
        remark: row.get(5)?,
        lesson_hours: Vec::new(),
        other_working_hours: Vec::new(),
        transportation_expenses: Vec::new(),
        is_created: true,
        is_deleted: false,
    })
}

fn map_lesson_hours_row(row: &Row<'_>) -> rusqlite::Result<(String, LessonHours)> {
    let timesheet_id: String = row.get(0)?;
    let mut lh = LessonHours::new(timesheet_id.clone(), row.get::<_, String>(1)?, row.get(2)?);
    lh.is_created = true;
    Ok((timesheet_id, lh))
}

fn map_other_working_hours_row(row: &Row<'_>) -> rusqlite::Result<(String, OtherWorkingHours)> {
    let timesheet_id: String = row.get(1)?;
    let owh = OtherWorkingHours {
        id: row.get(0)?,
        timesheet_id: timesheet_id.clone(),
        timesheet_config_id: row.get(2)?,
        start_time: decode_instant(3, row.get(3)?)?,
        end_time: decode_instant(4, row.get(4)?)?,
        total_minutes: row.get(5)?,
        remarks: row.get(6)?,
        is_deleted: false,
    };
    Ok((timesheet_id, owh))
}

fn map_transportation_expense_row(
    row: &Row<'_>,
) -> rusqlite::Result<(String, TransportationExpense)> {
    let timesheet_id: String = row.get(1)?;
    let transportation_type: String = row.get(2)?;
    let expense = TransportationExpense {
        id: row.get(0)?,
        timesheet_id: timesheet_id.clone(),
        transportation_type: decode_enum(2, &transportation_type)?,
        transportation_from: row.get(3)?,
        transportation_to: row.get(4)?,
        cost_amount: row.get(5)?,
        round_trip: row.get(6)?,
        remarks: row.get(7)?,
        is_deleted: false,
    };
    Ok((timesheet_id, expense))
}

// =============================================================================
// Writes
// =============================================================================

/// Insert a new timesheet with every live entry it carries.
fn insert_timesheet_rows(tx: &Transaction<'_>, timesheet: &Timesheet, now: i64) -> DomainResult<()> {
    if timesheet.id.is_empty() {
        return Err(TimesheetError::Internal("timesheet id must be assigned before insert".into()));
    }

    tx.execute(
        "INSERT INTO timesheet (timesheet_id, staff_id, location_id, timesheet_date,
            timesheet_status, remark, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            timesheet.id,
            timesheet.staff_id,
            timesheet.location_id,
            encode_date(timesheet.date),
            timesheet.status.as_str(),
            timesheet.remark,
            now,
        ],
    )
    .map_err(InfraError::from)?;

    for lh in timesheet.live_lesson_hours() {
        insert_lesson_hours(tx, &timesheet.id, lh, now)?;
    }
    for owh in timesheet.other_working_hours.iter().filter(|o| !o.is_deleted) {
        upsert_other_working_hours(tx, &timesheet.id, owh, now)?;
    }
    for expense in timesheet.transportation_expenses.iter().filter(|t| !t.is_deleted) {
        upsert_transportation_expense(tx, &timesheet.id, expense, now)?;
    }
    Ok(())
}

fn insert_lesson_hours(
    tx: &Transaction<'_>,
    timesheet_id: &str,
    lh: &LessonHours,
    now: i64,
) -> DomainResult<()> {
    tx.execute(
        "INSERT INTO timesheet_lesson_hours (timesheet_id, lesson_id, flag_on, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![timesheet_id, lh.lesson_id, bool_to_int(lh.flag_on), now],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

fn upsert_other_working_hours(
    tx: &Transaction<'_>,
    timesheet_id: &str,
    owh: &OtherWorkingHours,
    now: i64,
) -> DomainResult<()> {
    tx.execute(
        "INSERT INTO other_working_hours (other_working_hours_id, timesheet_id,
            timesheet_config_id, start_time, end_time, total_minutes, remarks,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT (other_working_hours_id) DO UPDATE SET
            timesheet_config_id = excluded.timesheet_config_id,
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            total_minutes = excluded.total_minutes,
            remarks = excluded.remarks,
            updated_at = excluded.updated_at",
        params![
            owh.id,
            timesheet_id,
            owh.timesheet_config_id,
            owh.start_time.timestamp(),
            owh.end_time.timestamp(),
            owh.total_minutes,
            owh.remarks,
            now,
        ],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

fn upsert_transportation_expense(
    tx: &Transaction<'_>,
    timesheet_id: &str,
    expense: &TransportationExpense,
    now: i64,
) -> DomainResult<()> {
    tx.execute(
        "INSERT INTO transportation_expense (transportation_expense_id, timesheet_id,
            transportation_type, transportation_from, transportation_to, cost_amount,
            round_trip, remarks, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
         ON CONFLICT (transportation_expense_id) DO UPDATE SET
            transportation_type = excluded.transportation_type,
            transportation_from = excluded.transportation_from,
            transportation_to = excluded.transportation_to,
            cost_amount = excluded.cost_amount,
            round_trip = excluded.round_trip,
            remarks = excluded.remarks,
            updated_at = excluded.updated_at",
        params![
            expense.id,
            timesheet_id,
            expense.transportation_type.as_str(),
            expense.transportation_from,
            expense.transportation_to,
            expense.cost_amount,
            bool_to_int(expense.round_trip),
            expense.remarks,
            now,
        ],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

fn touch_timesheet(tx: &Transaction<'_>, timesheet_id: &str, now: i64) -> DomainResult<()> {
    tx.execute(
        "UPDATE timesheet SET updated_at = ?1 WHERE timesheet_id = ?2 AND deleted_at IS NULL",
        params![now, timesheet_id],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

/// Soft-delete staff entries, then lesson-hours and the timesheet row
/// itself when `delete_timesheet` is set.
fn soft_delete_rows(
    tx: &Transaction<'_>,
    timesheet_id: &str,
    delete_timesheet: bool,
    now: i64,
) -> DomainResult<()> {
    let mut tables = vec!["other_working_hours", "transportation_expense"];
    if delete_timesheet {
        tables.extend(["timesheet_lesson_hours", "timesheet"]);
    }
    for table in tables {
        let sql = format!(
            "UPDATE {table} SET deleted_at = ?1, updated_at = ?1
             WHERE timesheet_id = ?2 AND deleted_at IS NULL"
        );
        tx.execute(&sql, params![now, timesheet_id]).map_err(InfraError::from)?;
    }
    Ok(())
}
