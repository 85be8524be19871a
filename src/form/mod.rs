//! Task creation form: data shape, advisory validation and templates.
//!
//! The browser form checks the same rules as the service before it submits,
//! with one difference: a due date is only "in the past" when it falls on
//! an earlier calendar day (UTC). Messages are the Portuguese strings the
//! UI shows next to each field.

mod templates;

pub use templates::{apply_template, template_config, TemplateConfig, TASK_TEMPLATES};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::task::rules::{self, PastDateGranularity, RuleViolation, Schedule};
use crate::task::{
    CreateTaskParams, FieldError, Recurrence, RecurrenceType, TaskPriority, TaskTemplate,
};

pub mod messages {
    pub const TITLE_TOO_SHORT: &str = "O título deve ter pelo menos 3 caracteres";
    pub const TITLE_TOO_LONG: &str = "O título deve ter no máximo 100 caracteres";
    pub const TITLE_REQUIRED: &str = "O título da tarefa é obrigatório";
    pub const DESCRIPTION_TOO_LONG: &str = "A descrição deve ter no máximo 1000 caracteres";
    pub const DUE_TIME_FORMAT: &str = "O horário deve estar no formato HH:MM";
    pub const FREQUENCY_RANGE: &str = "A frequência deve ser um número entre 1 e 30";
    pub const DUE_DATE_INVALID: &str = "Informe uma data de vencimento válida";
    pub const END_DATE_INVALID: &str = "Informe uma data de fim de recorrência válida";
    pub const TIME_NEEDS_DATE: &str =
        "É necessário definir uma data de vencimento para especificar o horário";
    pub const RECURRENCE_NEEDS_DATE: &str =
        "É necessário definir uma data de vencimento para tarefas recorrentes";
    pub const DUE_DATE_IN_PAST: &str = "A data de vencimento não pode ser anterior à data atual";
    pub const END_DATE_NOT_AFTER_DUE: &str =
        "A data de fim de recorrência deve ser posterior à data de vencimento";
}

/// Recurrence section of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormRecurrence {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    pub frequency: i64,
    pub end_date: String,
}

impl Default for FormRecurrence {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: RecurrenceType::Daily,
            frequency: 1,
            end_date: String::new(),
        }
    }
}

/// Raw form state. Text inputs are strings; empty means unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFormData {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub due_time: String,
    pub priority: TaskPriority,
    pub recurrence: FormRecurrence,
    /// `""` from the template picker means no template
    #[serde(deserialize_with = "deserialize_template")]
    pub template: Option<TaskTemplate>,
}

fn deserialize_template<'de, D>(deserializer: D) -> Result<Option<TaskTemplate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => TaskTemplate::parse(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unknown template {:?}", value))),
    }
}

impl Default for TaskFormData {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            due_time: String::new(),
            priority: TaskPriority::Medium,
            recurrence: FormRecurrence::default(),
            template: None,
        }
    }
}

/// A message shown under one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFieldError {
    pub path: &'static str,
    pub message: &'static str,
}

impl FormFieldError {
    fn new(path: &'static str, message: &'static str) -> Self {
        Self { path, message }
    }
}

impl From<FieldError> for FormFieldError {
    fn from(e: FieldError) -> Self {
        let message = match e {
            FieldError::TitleLength => messages::TITLE_TOO_SHORT,
            FieldError::TitleBlank => messages::TITLE_REQUIRED,
            FieldError::DescriptionTooLong => messages::DESCRIPTION_TOO_LONG,
            FieldError::DueTimeFormat => messages::DUE_TIME_FORMAT,
            FieldError::FrequencyOutOfRange => messages::FREQUENCY_RANGE,
        };
        Self::new(e.path(), message)
    }
}

impl From<RuleViolation> for FormFieldError {
    fn from(v: RuleViolation) -> Self {
        match v {
            RuleViolation::DueDateRequiredWhenTimeProvided => {
                Self::new("dueTime", messages::TIME_NEEDS_DATE)
            }
            RuleViolation::DueDateRequiredForRecurrence => {
                Self::new("dueDate", messages::RECURRENCE_NEEDS_DATE)
            }
            RuleViolation::DueDateCannotBeInPast => {
                Self::new("dueDate", messages::DUE_DATE_IN_PAST)
            }
            RuleViolation::RecurrenceEndDateMustBeAfterDueDate => {
                Self::new("recurrence.endDate", messages::END_DATE_NOT_AFTER_DUE)
            }
        }
    }
}

impl TaskFormData {
    /// Check the form as of `now` and build the request it would submit.
    ///
    /// Field errors are collected, one per field. Cross-field rules run once
    /// both dates parse; only the first violation is reported.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<CreateTaskParams, Vec<FormFieldError>> {
        let mut errors = Vec::new();

        if let Err(e) = check_title(&self.title) {
            errors.push(e);
        }
        if !self.description.is_empty() {
            if let Err(e) = rules::check_description(&self.description) {
                errors.push(e.into());
            }
        }
        if !self.due_time.is_empty() {
            if let Err(e) = rules::check_due_time(&self.due_time) {
                errors.push(e.into());
            }
        }
        let recurring = self.recurrence.enabled;
        if recurring {
            if let Err(e) = rules::check_frequency(self.recurrence.frequency) {
                errors.push(e.into());
            }
        }

        let due_date = parse_optional_date(&self.due_date, "dueDate", messages::DUE_DATE_INVALID);
        let end_date = if recurring {
            parse_optional_date(
                &self.recurrence.end_date,
                "recurrence.endDate",
                messages::END_DATE_INVALID,
            )
        } else {
            Ok(None)
        };

        match (due_date, end_date) {
            (Ok(due_date), Ok(end_date)) => {
                let schedule = Schedule {
                    due_date,
                    has_due_time: !self.due_time.is_empty(),
                    has_recurrence: recurring,
                    recurrence_end_date: end_date,
                };
                if let Err(violation) =
                    rules::check_schedule(&schedule, now, PastDateGranularity::CalendarDay)
                {
                    errors.push(violation.into());
                }
                if errors.is_empty() {
                    return Ok(self.to_params(due_date, end_date));
                }
            }
            (due_date, end_date) => {
                errors.extend(due_date.err());
                errors.extend(end_date.err());
            }
        }

        Err(errors)
    }

    fn to_params(
        &self,
        due_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> CreateTaskParams {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        CreateTaskParams {
            title: self.title.clone(),
            description: non_empty(&self.description),
            due_date,
            due_time: non_empty(&self.due_time),
            priority: self.priority,
            recurrence: self.recurrence.enabled.then(|| Recurrence {
                kind: self.recurrence.kind,
                frequency: self.recurrence.frequency,
                end_date,
            }),
            template: self.template,
        }
    }
}

fn check_title(title: &str) -> Result<(), FormFieldError> {
    match rules::check_title(title) {
        Ok(()) => Ok(()),
        Err(FieldError::TitleLength) if title.chars().count() > rules::TITLE_MAX_CHARS => {
            Err(FormFieldError::new("title", messages::TITLE_TOO_LONG))
        }
        Err(e) => Err(e.into()),
    }
}

/// `YYYY-MM-DD` (midnight UTC) or RFC 3339. Empty means unset.
fn parse_optional_date(
    value: &str,
    path: &'static str,
    message: &'static str,
) -> Result<Option<DateTime<Utc>>, FormFieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| FormFieldError::new(path, message))
}
