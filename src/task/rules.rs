//! Validation rule set for tasks.
//!
//! One definition, two callers: the service boundary evaluates it with
//! [`PastDateGranularity::Instant`], the form boundary with
//! [`PastDateGranularity::CalendarDay`]. The form is advisory, the service
//! is authoritative.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveTime, Utc};
use regex::Regex;

use super::model::CreateTaskParams;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const FREQUENCY_MIN: i64 = 1;
pub const FREQUENCY_MAX: i64 = 30;

static DUE_TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("due time pattern is valid")
});

/// A single field that fails its shape check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("title must be between 3 and 100 characters")]
    TitleLength,
    #[error("title cannot be blank")]
    TitleBlank,
    #[error("description must be at most 1000 characters")]
    DescriptionTooLong,
    #[error("dueTime must use the HH:MM format")]
    DueTimeFormat,
    #[error("recurrence frequency must be between 1 and 30")]
    FrequencyOutOfRange,
}

impl FieldError {
    /// Path of the offending field in the request body.
    pub fn path(&self) -> &'static str {
        match self {
            FieldError::TitleLength | FieldError::TitleBlank => "title",
            FieldError::DescriptionTooLong => "description",
            FieldError::DueTimeFormat => "dueTime",
            FieldError::FrequencyOutOfRange => "recurrence.frequency",
        }
    }
}

/// A cross-field business rule that a task violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("a due date is required when a due time is provided")]
    DueDateRequiredWhenTimeProvided,
    #[error("a due date is required for recurring tasks")]
    DueDateRequiredForRecurrence,
    #[error("the recurrence end date must be after the due date")]
    RecurrenceEndDateMustBeAfterDueDate,
    #[error("the due date cannot be in the past")]
    DueDateCannotBeInPast,
}

impl RuleViolation {
    /// Machine-readable reason code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            RuleViolation::DueDateRequiredWhenTimeProvided => "dueDateRequiredWhenTimeProvided",
            RuleViolation::DueDateRequiredForRecurrence => "dueDateRequiredForRecurrence",
            RuleViolation::RecurrenceEndDateMustBeAfterDueDate => {
                "recurrenceEndDateMustBeAfterDueDate"
            }
            RuleViolation::DueDateCannotBeInPast => "dueDateCannotBeInPast",
        }
    }
}

/// How "in the past" is decided for the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PastDateGranularity {
    /// Compare against the exact current instant.
    Instant,
    /// Compare against midnight (UTC) of the current day, so anything due
    /// earlier today still passes.
    CalendarDay,
}

impl PastDateGranularity {
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            PastDateGranularity::Instant => now,
            PastDateGranularity::CalendarDay => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// The temporal fields the cross-field rules look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    pub due_date: Option<DateTime<Utc>>,
    pub has_due_time: bool,
    pub has_recurrence: bool,
    pub recurrence_end_date: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn of(params: &CreateTaskParams) -> Self {
        Self {
            due_date: params.due_date,
            has_due_time: params.due_time.as_deref().is_some_and(|t| !t.is_empty()),
            has_recurrence: params.recurrence.is_some(),
            recurrence_end_date: params.recurrence.as_ref().and_then(|r| r.end_date),
        }
    }
}

pub fn check_title(title: &str) -> Result<(), FieldError> {
    let len = title.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
        return Err(FieldError::TitleLength);
    }
    if title.trim().is_empty() {
        return Err(FieldError::TitleBlank);
    }
    Ok(())
}

pub fn check_description(description: &str) -> Result<(), FieldError> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(FieldError::DescriptionTooLong);
    }
    Ok(())
}

pub fn check_due_time(due_time: &str) -> Result<(), FieldError> {
    if DUE_TIME_PATTERN.is_match(due_time) {
        Ok(())
    } else {
        Err(FieldError::DueTimeFormat)
    }
}

pub fn check_frequency(frequency: i64) -> Result<(), FieldError> {
    if (FREQUENCY_MIN..=FREQUENCY_MAX).contains(&frequency) {
        Ok(())
    } else {
        Err(FieldError::FrequencyOutOfRange)
    }
}

/// Field-shape checks for a creation request. Returns the first failure.
pub fn check_fields(params: &CreateTaskParams) -> Result<(), FieldError> {
    check_title(&params.title)?;
    if let Some(description) = params.description.as_deref() {
        check_description(description)?;
    }
    if let Some(due_time) = params.due_time.as_deref() {
        check_due_time(due_time)?;
    }
    if let Some(recurrence) = params.recurrence.as_ref() {
        check_frequency(recurrence.frequency)?;
    }
    Ok(())
}

/// Cross-field checks, evaluated in a fixed order; the first failure wins.
pub fn check_schedule(
    schedule: &Schedule,
    now: DateTime<Utc>,
    granularity: PastDateGranularity,
) -> Result<(), RuleViolation> {
    if schedule.has_due_time && schedule.due_date.is_none() {
        return Err(RuleViolation::DueDateRequiredWhenTimeProvided);
    }
    if schedule.has_recurrence && schedule.due_date.is_none() {
        return Err(RuleViolation::DueDateRequiredForRecurrence);
    }
    if let (Some(end_date), Some(due_date)) = (schedule.recurrence_end_date, schedule.due_date) {
        if end_date <= due_date {
            return Err(RuleViolation::RecurrenceEndDateMustBeAfterDueDate);
        }
    }
    if let Some(due_date) = schedule.due_date {
        if due_date < granularity.cutoff(now) {
            return Err(RuleViolation::DueDateCannotBeInPast);
        }
    }
    Ok(())
}
