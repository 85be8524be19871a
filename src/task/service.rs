//! Task service: business rules on top of a [`TaskStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::model::{CreateTaskParams, NewTask, Task, TaskStatus};
use super::rules::{self, FieldError, PastDateGranularity, RuleViolation, Schedule};
use crate::task_store::{StoreError, TaskStore};

/// Errors that can occur during task operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid field {}: {0}", .0.path())]
    InvalidField(FieldError),

    #[error("business rule violated: {}", .0.code())]
    BusinessRule(RuleViolation),

    #[error("task {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FieldError> for ServiceError {
    fn from(e: FieldError) -> Self {
        ServiceError::InvalidField(e)
    }
}

impl From<RuleViolation> for ServiceError {
    fn from(v: RuleViolation) -> Self {
        ServiceError::BusinessRule(v)
    }
}

/// Orchestrates task creation, listing and the small set of follow-up
/// operations. Every read and write is scoped by account id.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Create a task owned by `(account_id, user_id)`.
    ///
    /// # Errors
    ///
    /// `InvalidField` or `BusinessRule` when the request is rejected; nothing
    /// is written in that case.
    pub async fn create_task(
        &self,
        account_id: i64,
        user_id: i64,
        params: CreateTaskParams,
    ) -> Result<Task, ServiceError> {
        self.create_task_at(account_id, user_id, params, Utc::now())
            .await
    }

    /// Same as [`TaskService::create_task`] with an explicit "now".
    pub async fn create_task_at(
        &self,
        account_id: i64,
        user_id: i64,
        params: CreateTaskParams,
        now: DateTime<Utc>,
    ) -> Result<Task, ServiceError> {
        rules::check_fields(&params)?;
        if let Err(violation) =
            rules::check_schedule(&Schedule::of(&params), now, PastDateGranularity::Instant)
        {
            tracing::debug!(
                account_id,
                reason = violation.code(),
                "Rejected task creation"
            );
            return Err(violation.into());
        }

        let task = self
            .store
            .insert(NewTask::from_params(account_id, user_id, params, now))
            .await?;
        tracing::info!(account_id, user_id, task_id = task.id, "Created task");
        Ok(task)
    }

    /// All non-deleted tasks of an account, oldest first.
    pub async fn list_tasks(&self, account_id: i64) -> Result<Vec<Task>, ServiceError> {
        Ok(self.store.list_by_account(account_id).await?)
    }

    pub async fn get_task(&self, account_id: i64, id: i64) -> Result<Task, ServiceError> {
        self.store
            .get(account_id, id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Move a task to another status and bump its modification time.
    pub async fn update_status(
        &self,
        account_id: i64,
        id: i64,
        status: TaskStatus,
    ) -> Result<Task, ServiceError> {
        let task = self
            .store
            .update_status(account_id, id, status, Utc::now())
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        tracing::info!(account_id, task_id = id, status = %status, "Updated task status");
        Ok(task)
    }

    /// Soft delete: the task stays stored but disappears from reads.
    pub async fn delete_task(&self, account_id: i64, id: i64) -> Result<(), ServiceError> {
        if self.store.soft_delete(account_id, id, Utc::now()).await? {
            tracing::info!(account_id, task_id = id, "Deleted task");
            Ok(())
        } else {
            Err(ServiceError::NotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{Recurrence, RecurrenceType, TaskPriority};
    use crate::task_store::InMemoryTaskStore;
    use chrono::TimeZone;

    fn service() -> TaskService {
        TaskService::new(Arc::new(InMemoryTaskStore::new()))
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_sets_pending_and_timestamps() {
        let service = service();
        let mut params = CreateTaskParams::new("Pay bills", TaskPriority::High);
        params.due_date = Some(date(2099, 1, 1));
        params.due_time = Some("14:30".to_string());

        let task = service
            .create_task(1, 1, params)
            .await
            .expect("Failed to create task");

        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.due_time.as_deref(), Some("14:30"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.deleted);
        assert_eq!(task.date_created, task.date_modified);
    }

    #[tokio::test]
    async fn test_time_without_date_is_rejected_and_not_stored() {
        let service = service();
        let mut params = CreateTaskParams::new("Xyz", TaskPriority::Low);
        params.due_time = Some("09:00".to_string());

        let err = service.create_task(1, 1, params).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BusinessRule(RuleViolation::DueDateRequiredWhenTimeProvided)
        ));
        assert!(service.list_tasks(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recurrence_end_before_due_is_rejected() {
        let service = service();
        let mut params = CreateTaskParams::new("Recurring", TaskPriority::Medium);
        params.due_date = Some(date(2099, 1, 1));
        params.recurrence = Some(Recurrence {
            kind: RecurrenceType::Weekly,
            frequency: 1,
            end_date: Some(date(2098, 1, 1)),
        });

        let err = service.create_task(1, 1, params).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BusinessRule(RuleViolation::RecurrenceEndDateMustBeAfterDueDate)
        ));
    }

    #[tokio::test]
    async fn test_past_due_date_is_rejected() {
        let service = service();
        let mut params = CreateTaskParams::new("Past", TaskPriority::High);
        params.due_date = Some(date(2000, 1, 1));

        let err = service.create_task(1, 1, params).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BusinessRule(RuleViolation::DueDateCannotBeInPast)
        ));
    }

    #[tokio::test]
    async fn test_invalid_field_is_rejected_before_rules() {
        let service = service();
        let mut params = CreateTaskParams::new("Xyz", TaskPriority::Low);
        params.due_time = Some("25:00".to_string());

        let err = service.create_task(1, 1, params).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidField(FieldError::DueTimeFormat)
        ));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_account_and_ordered() {
        let service = service();
        for title in ["First", "Second"] {
            service
                .create_task(1, 1, CreateTaskParams::new(title, TaskPriority::Low))
                .await
                .unwrap();
        }
        service
            .create_task(2, 9, CreateTaskParams::new("Other account", TaskPriority::Low))
            .await
            .unwrap();

        let tasks = service.list_tasks(1).await.unwrap();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert!(tasks.iter().all(|t| t.id_account == 1));
    }

    #[tokio::test]
    async fn test_deleted_task_is_hidden() {
        let service = service();
        let task = service
            .create_task(1, 1, CreateTaskParams::new("Temporary", TaskPriority::Low))
            .await
            .unwrap();

        service.delete_task(1, task.id).await.unwrap();

        assert!(service.list_tasks(1).await.unwrap().is_empty());
        assert!(matches!(
            service.get_task(1, task.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_task(1, task.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_other_account_cannot_touch_task() {
        let service = service();
        let task = service
            .create_task(1, 1, CreateTaskParams::new("Mine", TaskPriority::Low))
            .await
            .unwrap();

        assert!(matches!(
            service.get_task(2, task.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.update_status(2, task.id, TaskStatus::Done).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_task(2, task.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_bumps_modified() {
        let service = service();
        let task = service
            .create_task(1, 1, CreateTaskParams::new("Work", TaskPriority::Medium))
            .await
            .unwrap();

        let updated = service
            .update_status(1, task.id, TaskStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.date_modified >= task.date_modified);
        assert_eq!(updated.date_created, task.date_created);
    }
}
