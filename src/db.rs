// src/db.rs
use crate::variant::{PlanAssignment, ServiceError, WorkoutDataService, WorkoutPlan};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Workout plan not found: {0}")]
    PlanNotFound(String),
    #[error("Plan id cannot be empty")]
    EmptyPlanId,
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

const DB_FILE_NAME: &str = "plans.sqlite";

/// Stored plan row, including when it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRecord {
    pub plan: WorkoutPlan,
    pub updated_at: DateTime<Utc>,
}

/// Gets the path to the SQLite database file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_db_path() -> Result<PathBuf, Error> {
    let data_dir = dirs::data_dir().ok_or(Error::DataDir)?;
    let app_dir = data_dir.join(crate::config::APP_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, Error> {
    Connection::open(path).map_err(Error::Connection)
}

/// Creates the tables if they don't exist.
pub fn init_db(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS workout_plans (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            active_variant_id TEXT,
            updated_at TEXT NOT NULL            -- RFC3339
        )",
        [],
    )
    .map_err(Error::Connection)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS plan_assignments (
            user_id TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            variant_id TEXT,
            PRIMARY KEY (user_id, plan_id)
        )",
        [],
    )
    .map_err(Error::Connection)?;

    Ok(())
}

fn map_row_to_plan(row: &Row) -> Result<PlanRecord, rusqlite::Error> {
    let updated_at_str: String = row.get(3)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(PlanRecord {
        plan: WorkoutPlan { id: row.get(0)?, name: row.get(1)?, active_variant_id: row.get(2)? },
        updated_at,
    })
}

/// Inserts a plan or overwrites the one with the same id.
pub fn upsert_plan(conn: &Connection, plan: &WorkoutPlan) -> Result<(), Error> {
    let id = plan.id.trim();
    if id.is_empty() {
        return Err(Error::EmptyPlanId);
    }
    let active_variant = plan.active_variant_id.as_deref().filter(|v| !v.is_empty());
    conn.execute(
        "INSERT INTO workout_plans (id, name, active_variant_id, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            active_variant_id = excluded.active_variant_id,
            updated_at = excluded.updated_at",
        params![id, plan.name.trim(), active_variant, Utc::now().to_rfc3339()],
    )
    .map_err(Error::InsertFailed)?;
    Ok(())
}

pub fn get_plan(conn: &Connection, id: &str) -> Result<Option<PlanRecord>, Error> {
    conn.query_row(
        "SELECT id, name, active_variant_id, updated_at FROM workout_plans WHERE id = ?1",
        params![id],
        map_row_to_plan,
    )
    .optional()
    .map_err(Error::QueryFailed)
}

pub fn list_plans(conn: &Connection) -> Result<Vec<PlanRecord>, Error> {
    let mut stmt = conn
        .prepare("SELECT id, name, active_variant_id, updated_at FROM workout_plans ORDER BY id ASC")
        .map_err(Error::QueryFailed)?;
    let rows = stmt.query_map([], map_row_to_plan).map_err(Error::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Error::QueryFailed)
}

/// Deletes a plan together with every assignment pointing at it.
pub fn delete_plan(conn: &Connection, id: &str) -> Result<(), Error> {
    conn.execute("DELETE FROM plan_assignments WHERE plan_id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    let rows = conn
        .execute("DELETE FROM workout_plans WHERE id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    if rows == 0 {
        return Err(Error::PlanNotFound(id.to_string()));
    }
    Ok(())
}

/// Assigns (or re-pins) a plan for a user. The plan has to exist.
pub fn assign_plan(conn: &Connection, user_id: &str, assignment: &PlanAssignment) -> Result<(), Error> {
    if get_plan(conn, &assignment.plan_id)?.is_none() {
        return Err(Error::PlanNotFound(assignment.plan_id.clone()));
    }
    conn.execute(
        "INSERT INTO plan_assignments (user_id, plan_id, variant_id) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, plan_id) DO UPDATE SET variant_id = excluded.variant_id",
        params![user_id, assignment.plan_id, assignment.variant_id],
    )
    .map_err(Error::InsertFailed)?;
    Ok(())
}

pub fn unassign_plan(conn: &Connection, user_id: &str, plan_id: &str) -> Result<bool, Error> {
    let rows = conn
        .execute(
            "DELETE FROM plan_assignments WHERE user_id = ?1 AND plan_id = ?2",
            params![user_id, plan_id],
        )
        .map_err(Error::DeleteFailed)?;
    Ok(rows > 0)
}

pub fn list_assignments(conn: &Connection, user_id: &str) -> Result<Vec<PlanAssignment>, Error> {
    let mut stmt = conn
        .prepare("SELECT plan_id, variant_id FROM plan_assignments WHERE user_id = ?1 ORDER BY plan_id ASC")
        .map_err(Error::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id], |row| Ok(PlanAssignment::new(row.get::<_, String>(0)?, row.get(1)?)))
        .map_err(Error::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Error::QueryFailed)
}

/// Plan lookups for variant resolution, backed by the local database.
pub struct SqliteWorkoutData<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteWorkoutData<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl WorkoutDataService for SqliteWorkoutData<'_> {
    fn get_workout_plan_by_id(&self, id: &str) -> Result<Option<WorkoutPlan>, ServiceError> {
        get_plan(self.conn, id)
            .map(|record| record.map(|r| r.plan))
            .map_err(|e| ServiceError::Backend(e.to_string()))
    }
}
