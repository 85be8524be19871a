//! Task domain: entity model, validation rules and the task service.

pub mod model;
pub mod rules;
pub mod service;

pub use model::{
    CreateTaskParams, NewTask, Recurrence, RecurrenceType, Task, TaskPriority, TaskStatus,
    TaskTemplate,
};
pub use rules::{FieldError, PastDateGranularity, RuleViolation, Schedule};
pub use service::{ServiceError, TaskService};
