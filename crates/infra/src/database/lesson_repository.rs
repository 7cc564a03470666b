//! Lesson read model backed by SQLite.
//!
//! Lessons are owned by the scheduling service; this table is the local
//! projection used when validating lifecycle transitions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, Row};
use timesheet_core::{LessonReader, OperationContext};
use timesheet_domain::{Lesson, Result as DomainResult};
use tokio::task;

use super::codec::{decode_enum, decode_instant, placeholders};
use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteLessonRepository {
    db: Arc<DbManager>,
}

impl SqliteLessonRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LessonReader for SqliteLessonRepository {
    async fn find_by_ids(
        &self,
        _ctx: &OperationContext,
        lesson_ids: &[String],
    ) -> DomainResult<Vec<Lesson>> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = Arc::clone(&self.db);
        let lesson_ids = lesson_ids.to_vec();
        task::spawn_blocking(move || -> DomainResult<Vec<Lesson>> {
            let conn = db.get_connection()?;
            query_lessons(&conn, &lesson_ids)
        })
        .await
        .map_err(InfraError::from)?
    }
}

// Soft-deleted lessons are returned too; only the teacher links filter on
// `deleted_at`.
const SELECT_LESSONS_SQL: &str = "SELECT lesson_id, location_id, start_time, scheduling_status
    FROM lessons
    WHERE lesson_id IN ({ids})
    ORDER BY start_time, lesson_id";

const SELECT_LESSON_TEACHERS_SQL: &str = "SELECT lesson_id, teacher_id
    FROM lessons_teachers
    WHERE deleted_at IS NULL AND lesson_id IN ({ids})
    ORDER BY teacher_id";

fn query_lessons(conn: &Connection, lesson_ids: &[String]) -> DomainResult<Vec<Lesson>> {
    let in_list = placeholders(lesson_ids.len());

    let mut stmt =
        conn.prepare(&SELECT_LESSONS_SQL.replace("{ids}", &in_list)).map_err(InfraError::from)?;
    let mut lessons = stmt
        .query_map(params_from_iter(lesson_ids.iter()), map_lesson_row)
        .map_err(InfraError::from)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(InfraError::from)?;

    let mut stmt = conn
        .prepare(&SELECT_LESSON_TEACHERS_SQL.replace("{ids}", &in_list))
        .map_err(InfraError::from)?;
    let rows = stmt
        .query_map(params_from_iter(lesson_ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(InfraError::from)?;

    let mut teachers: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (lesson_id, teacher_id) = row.map_err(InfraError::from)?;
        teachers.entry(lesson_id).or_default().push(teacher_id);
    }
    for lesson in &mut lessons {
        lesson.teacher_ids = teachers.remove(&lesson.lesson_id).unwrap_or_default();
    }
    Ok(lessons)
}

fn map_lesson_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    let status: String = row.get(3)?;
    Ok(Lesson {
        lesson_id: row.get(0)?,
        location_id: row.get(1)?,
        start_time: decode_instant(2, row.get(2)?)?,
        scheduling_status: decode_enum(3, &status)?,
        teacher_ids: Vec::new(),
    })
}
