//! HTTP API for taskboard.
//!
//! ## Endpoints
//!
//! - `POST /api/v1/internal/task` - Create a task
//! - `GET /api/v1/internal/task` - List the caller's tasks
//! - `GET /api/v1/internal/task/{id}` - Get a single task
//! - `PATCH /api/v1/internal/task/{id}` - Change a task's status
//! - `DELETE /api/v1/internal/task/{id}` - Soft delete a task
//! - `GET /health` - Health check

pub mod auth;
pub mod crud;
pub mod error;
mod routes;
pub mod tasks;
pub mod types;

pub use error::ApiError;
pub use routes::{build_router, serve, AppState};
pub use types::*;
