#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::params;
use tempfile::TempDir;
use timesheet_core::{
    LessonEventReconciler, OperationContext, TimesheetBuilder, TimesheetStateMachine,
};
use timesheet_domain::{MessagingConfig, Requester, Role};
use timesheet_infra::database::{
    DbManager, SqliteConfirmationWindow, SqliteLessonRepository, SqliteSettingsRepository,
    SqliteTimesheetRepository,
};
use timesheet_infra::messaging::{ChannelPublisher, Envelope};
use tokio::sync::mpsc;

pub const LOCATION: &str = "loc-1";

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the schema applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("timesheet-test.db");

        let manager = DbManager::new(&db_path, 4, 1_000).expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn timesheets(&self) -> Arc<SqliteTimesheetRepository> {
        Arc::new(SqliteTimesheetRepository::new(Arc::clone(&self.manager)))
    }

    pub fn settings(&self) -> Arc<SqliteSettingsRepository> {
        Arc::new(SqliteSettingsRepository::new(Arc::clone(&self.manager)))
    }

    pub fn confirmation(&self) -> Arc<SqliteConfirmationWindow> {
        Arc::new(SqliteConfirmationWindow::new(Arc::clone(&self.manager)))
    }

    pub fn lessons(&self) -> Arc<SqliteLessonRepository> {
        Arc::new(SqliteLessonRepository::new(Arc::clone(&self.manager)))
    }

    /// Reconciler wired entirely to this database and `publisher`.
    pub fn reconciler(&self, publisher: &ChannelPublisher) -> LessonEventReconciler {
        let timesheets = self.timesheets();
        let settings = self.settings();
        let builder = TimesheetBuilder::new(timesheets.clone(), settings.clone(), settings.clone());
        LessonEventReconciler::new(
            timesheets.clone(),
            timesheets,
            self.confirmation(),
            settings,
            builder,
            Arc::new(publisher.clone()),
        )
    }

    pub fn state_machine(&self, publisher: &ChannelPublisher) -> TimesheetStateMachine {
        let timesheets = self.timesheets();
        let publisher = Arc::new(publisher.clone());
        TimesheetStateMachine::new(
            timesheets.clone(),
            timesheets,
            self.lessons(),
            self.confirmation(),
            publisher.clone(),
            publisher,
        )
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    /// Run a `SELECT COUNT(*)`-style query.
    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(sql, [], |row| row.get(0)).expect("count query should succeed")
    }

    pub fn insert_lesson(&self, lesson_id: &str, start: DateTime<Utc>, status: &str, teachers: &[&str]) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(
            "INSERT INTO lessons (lesson_id, location_id, start_time, scheduling_status)
             VALUES (?1, ?2, ?3, ?4)",
            params![lesson_id, LOCATION, start.timestamp(), status],
        )
        .expect("lesson insert should succeed");
        for teacher in teachers {
            conn.execute(
                "INSERT INTO lessons_teachers (lesson_id, teacher_id) VALUES (?1, ?2)",
                params![lesson_id, teacher],
            )
            .expect("teacher insert should succeed");
        }
    }

    pub fn insert_flag_log(&self, id: &str, staff_id: &str, flag_on: bool, change_time: DateTime<Utc>) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(
            "INSERT INTO auto_create_flag_activity_log (id, staff_id, flag_on, change_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, staff_id, flag_on, change_time.timestamp()],
        )
        .expect("flag log insert should succeed");
    }

    pub fn set_partner_flag(&self, id: &str, flag_on: bool, created_at: i64) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(
            "INSERT INTO partner_auto_create_timesheet_flag (id, flag_on, created_at)
             VALUES (?1, ?2, ?3)",
            params![id, flag_on, created_at],
        )
        .expect("partner flag insert should succeed");
    }

    pub fn insert_staff_route(&self, id: &str, staff_id: &str, cost_amount: i64) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(
            "INSERT INTO staff_transportation_expense (id, staff_id, location_id,
                transportation_type, transportation_from, transportation_to, cost_amount, round_trip)
             VALUES (?1, ?2, ?3, 'TYPE_TRAIN', 'Home', 'School', ?4, 1)",
            params![id, staff_id, LOCATION, cost_amount],
        )
        .expect("staff route insert should succeed");
    }

    /// Configure a period and confirm it for `location_id`.
    pub fn lock_period(&self, start: NaiveDate, end: NaiveDate, location_id: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        let period_id = format!("period-{start}");
        conn.execute(
            "INSERT OR IGNORE INTO timesheet_confirmation_period (id, start_date, end_date)
             VALUES (?1, ?2, ?3)",
            params![period_id, start.to_string(), end.to_string()],
        )
        .expect("period insert should succeed");
        conn.execute(
            "INSERT INTO timesheet_confirmation_info (id, period_id, location_id, confirmed_at)
             VALUES (?1, ?2, ?3, 0)",
            params![format!("{period_id}-{location_id}"), period_id, location_id],
        )
        .expect("confirmation insert should succeed");
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Publisher with a generous buffer and the receiving half for assertions.
pub fn publisher() -> (ChannelPublisher, mpsc::Receiver<Envelope>) {
    ChannelPublisher::new(&MessagingConfig::default())
}

/// Everything currently buffered on `receiver`.
pub fn drain(receiver: &mut mpsc::Receiver<Envelope>) -> Vec<Envelope> {
    let mut envelopes = Vec::new();
    while let Ok(envelope) = receiver.try_recv() {
        envelopes.push(envelope);
    }
    envelopes
}

/// 2023-06-10 12:00 in Tokyo.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 10, 3, 0, 0).unwrap()
}

pub fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, month, day, hour, 0, 0).unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, month, day).unwrap()
}

pub fn system_ctx() -> OperationContext {
    OperationContext::new(Requester::system("lesson-consumer"), now())
}

pub fn staff_ctx(staff_id: &str) -> OperationContext {
    OperationContext::new(Requester::new(staff_id, vec![Role::Teacher]), now())
}

pub fn admin_ctx() -> OperationContext {
    OperationContext::new(Requester::new("admin-1", vec![Role::SchoolAdmin]), now())
}
