//! Task storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing and dev)
//! - `sqlite`: SQLite database

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::task::{NewTask, Task, TaskStatus};

/// Errors surfaced by a task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend refused the write because a declared constraint failed.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Task store trait - implemented by all storage backends.
///
/// Every lookup is scoped by account id; deleted tasks are never returned.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Assign the next id and insert, as one atomic step.
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Non-deleted tasks of an account, ordered by creation (ascending id).
    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Task>, StoreError>;

    /// A single non-deleted task of an account.
    async fn get(&self, account_id: i64, id: i64) -> Result<Option<Task>, StoreError>;

    /// Set the status of a non-deleted task. Returns the updated task, or
    /// `None` when no such task exists for the account.
    async fn update_status(
        &self,
        account_id: i64,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError>;

    /// Mark a task deleted. Returns `false` when there was nothing to delete.
    async fn soft_delete(
        &self,
        account_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Task store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStoreType {
    #[default]
    Memory,
    Sqlite,
}

impl TaskStoreType {
    /// Parse from environment variable value. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "sqlite" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Create a task store based on type and data directory.
pub async fn create_task_store(
    store_type: TaskStoreType,
    data_dir: PathBuf,
) -> Result<Arc<dyn TaskStore>, StoreError> {
    match store_type {
        TaskStoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        TaskStoreType::Sqlite => {
            let store = SqliteTaskStore::new(data_dir).await?;
            Ok(Arc::new(store))
        }
    }
}
