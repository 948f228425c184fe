//! Error taxonomy shared by the domain managers.
//!
//! The HTTP layer owns the status-code mapping (400/404/403/500); stores
//! return `anyhow::Result` and managers translate failures into these
//! variants before they cross the route boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            AppError::Storage(err) => {
                // The storage detail stays in the logs, not in the response.
                tracing::error!("Storage error: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
