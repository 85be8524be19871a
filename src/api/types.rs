//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Success envelope: `{ "success": true, "data": ..., "timestamp": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Failure envelope: `{ "success": false, "error": {...}, "timestamp": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub fn new(error: ErrorDetail) -> Self {
        Self {
            success: false,
            error,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    /// Offending field, or the request path for unknown routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Active task store backend (`memory` or `sqlite`)
    pub store: String,
    pub persistent: bool,
    /// `disabled` or `jwt`
    pub auth_mode: String,
}

/// Response after deleting a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedTask {
    pub id: i64,
}
