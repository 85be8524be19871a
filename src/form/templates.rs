//! Predefined task templates for the creation form.

use super::TaskFormData;
use crate::task::{TaskPriority, TaskTemplate};

/// Defaults a template writes into the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateConfig {
    pub id: TaskTemplate,
    pub name: &'static str,
    pub summary: &'static str,
    pub title: &'static str,
    /// Empty means "leave the description alone"
    pub description: &'static str,
    pub priority: TaskPriority,
}

pub static TASK_TEMPLATES: [TemplateConfig; 4] = [
    TemplateConfig {
        id: TaskTemplate::Meeting,
        name: "Reunião",
        summary: "Template para reuniões",
        title: "Reunião: ",
        description: "Pauta:\n\nParticipantes:\n",
        priority: TaskPriority::Medium,
    },
    TemplateConfig {
        id: TaskTemplate::Project,
        name: "Projeto",
        summary: "Template para projetos",
        title: "Projeto: ",
        description: "Objetivos:\n\nEtapas:\n",
        priority: TaskPriority::High,
    },
    TemplateConfig {
        id: TaskTemplate::Reminder,
        name: "Lembrete",
        summary: "Template para lembretes",
        title: "Lembrete: ",
        description: "",
        priority: TaskPriority::Low,
    },
    TemplateConfig {
        id: TaskTemplate::Shopping,
        name: "Compra",
        summary: "Template para compras",
        title: "Comprar: ",
        description: "Local:\n\nQuantidade:\n",
        priority: TaskPriority::Medium,
    },
];

/// Defaults for `template`; `personalizado` has none.
pub fn template_config(template: TaskTemplate) -> Option<&'static TemplateConfig> {
    TASK_TEMPLATES.iter().find(|t| t.id == template)
}

/// Select `template` on the form and write its non-empty defaults.
pub fn apply_template(form: &mut TaskFormData, template: TaskTemplate) {
    form.template = Some(template);
    let Some(config) = template_config(template) else {
        return;
    };
    if !config.title.is_empty() {
        form.title = config.title.to_string();
    }
    if !config.description.is_empty() {
        form.description = config.description.to_string();
    }
    form.priority = config.priority;
}
