//! # taskboard
//!
//! Backend for a small TODO application.
//!
//! This library provides:
//! - HTTP APIs to create, list, read, update and soft delete tasks
//! - A single validation rule set shared by the service and the form
//! - Pluggable task storage (in-memory or SQLite)
//!
//! ## Request Flow
//!
//! ```text
//!   HTTP request
//!        │
//!        ▼
//!   require_auth ──► Credential
//!        │
//!        ▼
//!   CrudController (permissions, schema)
//!        │
//!        ▼
//!   TaskService (business rules) ──► TaskStore
//! ```
//!
//! ## Modules
//! - `api`: router, identity, request adapter and handlers
//! - `task`: entity model, validation rules and service
//! - `task_store`: storage backends
//! - `form`: advisory validation and templates for the creation form

pub mod api;
pub mod config;
pub mod form;
pub mod task;
pub mod task_store;
pub mod util;

pub use config::Config;
