//! Task entity and the shape of a creation request.
//!
//! # Invariants
//! - A freshly constructed [`NewTask`] is always `pendente` and not deleted
//! - `date_created == date_modified` until the task is touched again
//! - `id` is assigned by the store, never by the caller

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Priority level of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "média")]
    Medium,
    #[serde(rename = "baixa")]
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "alta",
            TaskPriority::Medium => "média",
            TaskPriority::Low => "baixa",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "alta" => Some(TaskPriority::High),
            "média" => Some(TaskPriority::Medium),
            "baixa" => Some(TaskPriority::Low),
            _ => None,
        }
    }
}

/// Status of a task in its lifecycle.
///
/// # State Machine
/// ```text
/// Pending -> InProgress -> Done
///        \-> Canceled
/// ```
/// Every task starts as `Pending`; later transitions are not restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "concluida")]
    Done,
    #[serde(rename = "cancelada")]
    Canceled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pendente",
            TaskStatus::InProgress => "em_andamento",
            TaskStatus::Done => "concluida",
            TaskStatus::Canceled => "cancelada",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendente" => Some(TaskStatus::Pending),
            "em_andamento" => Some(TaskStatus::InProgress),
            "concluida" => Some(TaskStatus::Done),
            "cancelada" => Some(TaskStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cadence of a recurring task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecurrenceType {
    #[serde(rename = "diária")]
    Daily,
    #[serde(rename = "semanal")]
    Weekly,
    #[serde(rename = "mensal")]
    Monthly,
    #[serde(rename = "anual")]
    Yearly,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "diária",
            RecurrenceType::Weekly => "semanal",
            RecurrenceType::Monthly => "mensal",
            RecurrenceType::Yearly => "anual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "diária" => Some(RecurrenceType::Daily),
            "semanal" => Some(RecurrenceType::Weekly),
            "mensal" => Some(RecurrenceType::Monthly),
            "anual" => Some(RecurrenceType::Yearly),
            _ => None,
        }
    }
}

/// Template tag a task was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskTemplate {
    #[serde(rename = "reunião")]
    Meeting,
    #[serde(rename = "projeto")]
    Project,
    #[serde(rename = "lembrete")]
    Reminder,
    #[serde(rename = "compra")]
    Shopping,
    #[serde(rename = "personalizado")]
    Custom,
}

impl TaskTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskTemplate::Meeting => "reunião",
            TaskTemplate::Project => "projeto",
            TaskTemplate::Reminder => "lembrete",
            TaskTemplate::Shopping => "compra",
            TaskTemplate::Custom => "personalizado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reunião" => Some(TaskTemplate::Meeting),
            "projeto" => Some(TaskTemplate::Project),
            "lembrete" => Some(TaskTemplate::Reminder),
            "compra" => Some(TaskTemplate::Shopping),
            "personalizado" => Some(TaskTemplate::Custom),
            _ => None,
        }
    }
}

/// Recurrence block of a creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    /// Repeat every `frequency` units of `kind` (1..=30)
    pub frequency: i64,
    #[serde(
        default,
        deserialize_with = "deserialize_utc_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<DateTime<Utc>>,
}

/// RFC 3339 timestamp in UTC (`Z` suffix). Other offsets are rejected.
fn deserialize_utc_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if !value.ends_with(['Z', 'z']) {
        return Err(de::Error::custom(format!(
            "expected a UTC timestamp ending in 'Z', got {:?}",
            value
        )));
    }
    DateTime::parse_from_rfc3339(&value)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(de::Error::custom)
}

/// Body of `POST /api/v1/internal/task`.
///
/// Optional fields accept both absence and `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskParams {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_utc_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TaskTemplate>,
}

impl CreateTaskParams {
    /// Minimal request with only the required fields set.
    pub fn new(title: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            due_time: None,
            priority,
            recurrence: None,
            template: None,
        }
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub id_account: i64,
    pub id_user: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub recurrence_type: Option<RecurrenceType>,
    pub recurrence_frequency: Option<i64>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub template: Option<TaskTemplate>,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub deleted: bool,
}

/// A task that has passed validation but has no id yet.
///
/// Stores turn this into a [`Task`] by assigning the next id atomically
/// with the insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub id_account: i64,
    pub id_user: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub recurrence_type: Option<RecurrenceType>,
    pub recurrence_frequency: Option<i64>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub template: Option<TaskTemplate>,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub deleted: bool,
}

impl NewTask {
    /// Build the record for a creation request owned by `(account_id, user_id)`.
    ///
    /// Status is forced to `pendente`, both timestamps to `now`, and empty
    /// optional strings are stored as absent.
    pub fn from_params(
        account_id: i64,
        user_id: i64,
        params: CreateTaskParams,
        now: DateTime<Utc>,
    ) -> Self {
        let (recurrence_type, recurrence_frequency, recurrence_end_date) = match params.recurrence
        {
            Some(r) => (Some(r.kind), Some(r.frequency), r.end_date),
            None => (None, None, None),
        };
        Self {
            id_account: account_id,
            id_user: user_id,
            title: params.title,
            description: params.description.filter(|d| !d.is_empty()),
            due_date: params.due_date,
            due_time: params.due_time.filter(|t| !t.is_empty()),
            priority: params.priority,
            status: TaskStatus::Pending,
            recurrence_type,
            recurrence_frequency,
            recurrence_end_date,
            template: params.template,
            date_created: now,
            date_modified: now,
            deleted: false,
        }
    }

    /// Attach the id assigned by the store.
    pub fn into_task(self, id: i64) -> Task {
        Task {
            id,
            id_account: self.id_account,
            id_user: self.id_user,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            due_time: self.due_time,
            priority: self.priority,
            status: self.status,
            recurrence_type: self.recurrence_type,
            recurrence_frequency: self.recurrence_frequency,
            recurrence_end_date: self.recurrence_end_date,
            template: self.template,
            date_created: self.date_created,
            date_modified: self.date_modified,
            deleted: self.deleted,
        }
    }
}
