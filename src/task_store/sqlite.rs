//! SQLite-based task store.

use super::{StoreError, TaskStore};
use crate::task::{NewTask, RecurrenceType, Task, TaskPriority, TaskStatus, TaskTemplate};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    id_account INTEGER NOT NULL,
    id_user INTEGER NOT NULL,
    title TEXT NOT NULL CHECK (length(title) BETWEEN 3 AND 100),
    description TEXT CHECK (description IS NULL OR length(description) <= 1000),
    due_date TEXT,
    due_time TEXT,
    priority TEXT NOT NULL CHECK (priority IN ('alta', 'média', 'baixa')),
    status TEXT NOT NULL DEFAULT 'pendente'
        CHECK (status IN ('pendente', 'em_andamento', 'concluida', 'cancelada')),
    recurrence_type TEXT,
    recurrence_frequency INTEGER
        CHECK (recurrence_frequency IS NULL OR recurrence_frequency BETWEEN 1 AND 30),
    recurrence_end_date TEXT,
    template TEXT,
    date_created TEXT NOT NULL,
    date_modified TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_tasks_account ON tasks(id_account, deleted, id);
"#;

const SELECT_COLUMNS: &str = "SELECT id, id_account, id_user, title, description, due_date,
        due_time, priority, status, recurrence_type, recurrence_frequency, recurrence_end_date,
        template, date_created, date_modified, deleted
 FROM tasks";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Open (or create) `tasks.db` inside `data_dir`.
    pub async fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to create data dir: {}", e)))?;
        let db_path = data_dir.join("tasks.db");

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            tracing::info!("Opened task database at {}", db_path.display());
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    fn select_one(
        conn: &Connection,
        account_id: i64,
        id: i64,
    ) -> Result<Option<Task>, StoreError> {
        let sql = format!(
            "{} WHERE id = ?1 AND id_account = ?2 AND deleted = 0",
            SELECT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![id, account_id], row_to_task)
            .optional()?)
    }
}

fn timestamp_to_string(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn unknown_value(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value {:?}", value).into(),
    )
}

fn required_enum<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    parse(&value).ok_or_else(|| unknown_value(idx, &value))
}

fn optional_enum<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| parse(&v).ok_or_else(|| unknown_value(idx, &v)))
        .transpose()
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value.map(|v| parse_timestamp(idx, &v)).transpose()
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let date_created: String = row.get(13)?;
    let date_modified: String = row.get(14)?;
    Ok(Task {
        id: row.get(0)?,
        id_account: row.get(1)?,
        id_user: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        due_date: optional_timestamp(row, 5)?,
        due_time: row.get(6)?,
        priority: required_enum(row, 7, TaskPriority::parse)?,
        status: required_enum(row, 8, TaskStatus::parse)?,
        recurrence_type: optional_enum(row, 9, RecurrenceType::parse)?,
        recurrence_frequency: row.get(10)?,
        recurrence_end_date: optional_timestamp(row, 11)?,
        template: optional_enum(row, 12, TaskTemplate::parse)?,
        date_created: parse_timestamp(13, &date_created)?,
        date_modified: parse_timestamp(14, &date_modified)?,
        deleted: row.get::<_, i64>(15)? != 0,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id_account, id_user, title, description, due_date, due_time,
                                    priority, status, recurrence_type, recurrence_frequency,
                                    recurrence_end_date, template, date_created, date_modified,
                                    deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    task.id_account,
                    task.id_user,
                    &task.title,
                    &task.description,
                    task.due_date.as_ref().map(timestamp_to_string),
                    &task.due_time,
                    task.priority.as_str(),
                    task.status.as_str(),
                    task.recurrence_type.map(|r| r.as_str()),
                    task.recurrence_frequency,
                    task.recurrence_end_date.as_ref().map(timestamp_to_string),
                    task.template.map(|t| t.as_str()),
                    timestamp_to_string(&task.date_created),
                    timestamp_to_string(&task.date_modified),
                    task.deleted as i64,
                ],
            )?;
            Ok(task.into_task(conn.last_insert_rowid()))
        })
        .await
    }

    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Task>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "{} WHERE id_account = ?1 AND deleted = 0 ORDER BY id ASC",
                SELECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params![account_id], row_to_task)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
        .await
    }

    async fn get(&self, account_id: i64, id: i64) -> Result<Option<Task>, StoreError> {
        self.with_conn(move |conn| Self::select_one(conn, account_id, id))
            .await
    }

    async fn update_status(
        &self,
        account_id: i64,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET status = ?1, date_modified = ?2
                 WHERE id = ?3 AND id_account = ?4 AND deleted = 0",
                params![status.as_str(), timestamp_to_string(&now), id, account_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            Self::select_one(conn, account_id, id)
        })
        .await
    }

    async fn soft_delete(
        &self,
        account_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET deleted = 1, date_modified = ?1
                 WHERE id = ?2 AND id_account = ?3 AND deleted = 0",
                params![timestamp_to_string(&now), id, account_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}
