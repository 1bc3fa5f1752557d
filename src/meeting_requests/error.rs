use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{response::IntoResponse, Json};
use diesel::result::DatabaseErrorKind;

use super::types::RequestStatus;

#[derive(Debug, thiserror::Error)]
pub enum MeetingRequestsError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Cannot {action} a request in status {from}")]
    InvalidTransition {
        action: &'static str,
        from: RequestStatus,
    },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    /// Another request took the reference number between lookup and write.
    #[error("Reference number already in use: {0}")]
    ReferenceTaken(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MeetingRequestsError {
    pub fn request_not_found(id: i64) -> Self {
        Self::NotFound(format!("Meeting request {id} not found"))
    }

    pub fn attachment_limit(max: usize) -> Self {
        Self::Validation(format!(
            "A meeting request can have at most {max} attachments"
        ))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidOperation(_) => "invalid_operation",
            Self::ReferenceTaken(_) => "reference_conflict",
            Self::Storage(_) => "storage_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

const REFERENCE_NUMBER_CONSTRAINT: &str = "meeting_requests_reference_number_key";

impl From<diesel::result::Error> for MeetingRequestsError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if info.constraint_name() == Some(REFERENCE_NUMBER_CONSTRAINT) =>
            {
                Self::ReferenceTaken(info.message().to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<JsonRejection> for MeetingRequestsError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for MeetingRequestsError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for MeetingRequestsError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for MeetingRequestsError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for MeetingRequestsError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::InvalidTransition { .. } | Self::InvalidOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ReferenceTaken(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Database(_) | Self::Internal(_) => {
                tracing::error!("{self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string(), "kind": self.kind() })),
        )
            .into_response()
    }
}
