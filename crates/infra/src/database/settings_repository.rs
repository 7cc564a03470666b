//! Auto-create preferences and staff default routes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension, Row};
use timesheet_core::{
    AutoCreateFlagLogReader, OperationContext, PartnerSettingsReader,
    StaffTransportationExpenseReader,
};
use timesheet_domain::{
    AutoCreateFlagActivityLog, Result as DomainResult, StaffTransportationExpense,
};
use tokio::task;

use super::codec::{decode_enum, decode_instant, placeholders};
use super::manager::DbManager;
use crate::errors::InfraError;

/// Reads the per-staff preference history, the partner default and staff
/// default transportation routes.
pub struct SqliteSettingsRepository {
    db: Arc<DbManager>,
}

impl SqliteSettingsRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

// Latest live entry per staff at or before the reference instant. Ties on `change_time`
// resolve to the greater ID.
const LATEST_FLAG_LOGS_SQL: &str = "SELECT id, staff_id, flag_on, change_time FROM (
        SELECT id, staff_id, flag_on, change_time,
            ROW_NUMBER() OVER (PARTITION BY staff_id ORDER BY change_time DESC, id DESC) AS rn
        FROM auto_create_flag_activity_log
        WHERE deleted_at IS NULL AND change_time <= ? AND staff_id IN ({ids})
    )
    WHERE rn = 1
    ORDER BY staff_id";

const PARTNER_FLAG_SQL: &str = "SELECT flag_on FROM partner_auto_create_timesheet_flag
    WHERE deleted_at IS NULL
    ORDER BY created_at DESC, id DESC
    LIMIT 1";

const STAFF_EXPENSE_SQL: &str = "SELECT id, staff_id, location_id, transportation_type,
        transportation_from, transportation_to, cost_amount, round_trip, remarks
    FROM staff_transportation_expense
    WHERE deleted_at IS NULL AND ({pairs})
    ORDER BY staff_id, location_id, id";

#[async_trait]
impl AutoCreateFlagLogReader for SqliteSettingsRepository {
    async fn find_latest_by_staff(
        &self,
        _ctx: &OperationContext,
        staff_ids: &[String],
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<AutoCreateFlagActivityLog>> {
        if staff_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = LATEST_FLAG_LOGS_SQL.replace("{ids}", &placeholders(staff_ids.len()));
        let mut values = vec![Value::Integer(at.timestamp())];
        values.extend(staff_ids.iter().map(|id| Value::Text(id.clone())));

        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Vec<AutoCreateFlagActivityLog>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let logs = stmt
                .query_map(params_from_iter(values), map_flag_log_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(logs)
        })
        .await
        .map_err(InfraError::from)?
    }
}

#[async_trait]
impl PartnerSettingsReader for SqliteSettingsRepository {
    async fn partner_auto_create_flag(&self, _ctx: &OperationContext) -> DomainResult<Option<bool>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Option<bool>> {
            let conn = db.get_connection()?;
            let flag = conn
                .query_row(PARTNER_FLAG_SQL, [], |row| row.get::<_, bool>(0))
                .optional()
                .map_err(InfraError::from)?;
            Ok(flag)
        })
        .await
        .map_err(InfraError::from)?
    }
}

#[async_trait]
impl StaffTransportationExpenseReader for SqliteSettingsRepository {
    async fn find_by_staff_and_location(
        &self,
        _ctx: &OperationContext,
        keys: &[(String, String)],
    ) -> DomainResult<Vec<StaffTransportationExpense>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pairs = vec!["(staff_id = ? AND location_id = ?)"; keys.len()].join(" OR ");
        let sql = STAFF_EXPENSE_SQL.replace("{pairs}", &pairs);
        let values: Vec<Value> = keys
            .iter()
            .flat_map(|(staff, location)| [Value::Text(staff.clone()), Value::Text(location.clone())])
            .collect();

        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<Vec<StaffTransportationExpense>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let expenses = stmt
                .query_map(params_from_iter(values), map_staff_expense_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(expenses)
        })
        .await
        .map_err(InfraError::from)?
    }
}

fn map_flag_log_row(row: &Row<'_>) -> rusqlite::Result<AutoCreateFlagActivityLog> {
    Ok(AutoCreateFlagActivityLog {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        flag_on: row.get(2)?,
        change_time: decode_instant(3, row.get(3)?)?,
    })
}

fn map_staff_expense_row(row: &Row<'_>) -> rusqlite::Result<StaffTransportationExpense> {
    let transportation_type: String = row.get(3)?;
    Ok(StaffTransportationExpense {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        location_id: row.get(2)?,
        transportation_type: decode_enum(3, &transportation_type)?,
        transportation_from: row.get(4)?,
        transportation_to: row.get(5)?,
        cost_amount: row.get(6)?,
        round_trip: row.get(7)?,
        remarks: row.get(8)?,
    })
}
