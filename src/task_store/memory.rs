//! In-memory task store (non-persistent).

use super::{StoreError, TaskStore};
use crate::task::{NewTask, Task, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    /// Kept in insertion order, which is also ascending id order.
    tasks: Vec<Task>,
    last_id: i64,
}

impl State {
    fn find_mut(&mut self, account_id: i64, id: i64) -> Option<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id && t.id_account == account_id && !t.deleted)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let task = task.into_task(state.last_id);
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Task>, StoreError> {
        let tasks = self
            .state
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| t.id_account == account_id && !t.deleted)
            .cloned()
            .collect();
        Ok(tasks)
    }

    async fn get(&self, account_id: i64, id: i64) -> Result<Option<Task>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .tasks
            .iter()
            .find(|t| t.id == id && t.id_account == account_id && !t.deleted)
            .cloned())
    }

    async fn update_status(
        &self,
        account_id: i64,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.find_mut(account_id, id).map(|task| {
            task.status = status;
            task.date_modified = now;
            task.clone()
        }))
    }

    async fn soft_delete(
        &self,
        account_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.find_mut(account_id, id) {
            Some(task) => {
                task.deleted = true;
                task.date_modified = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
