//! Application error taxonomy
//!
//! Central error type shared by the orchestrator, provider adapters and HTTP
//! handlers. The adapters never swallow errors; the HTTP layer is the only
//! place errors are translated into caller-visible responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Top-level application error
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct AppError {
    pub kind: AppErrorKind,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self { kind }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation {
            message: message.into(),
        })
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Auth {
            message: message.into(),
        })
    }

    /// Provider unreachable, timed out, or returned a non-success status.
    pub fn upstream_unavailable(provider: &str, message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::External(ExternalError::Unavailable {
            provider: provider.to_string(),
            message: message.into(),
        }))
    }

    /// Provider answered 2xx but without a usable body or checkout URL.
    pub fn upstream_protocol(provider: &str, message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::External(ExternalError::Protocol {
            provider: provider.to_string(),
            message: message.into(),
        }))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Storage {
            message: message.into(),
        }))
    }

    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::External(ExternalError::Unavailable { .. })
                | AppErrorKind::Infrastructure(InfrastructureError::Storage { .. })
        )
    }
}

#[derive(Debug, Error)]
pub enum AppErrorKind {
    /// Bad or missing input; reported to the caller, never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Bad internal token or bad webhook signature.
    #[error("unauthorized: {message}")]
    Auth { message: String },

    /// Failures talking to a payment provider.
    #[error(transparent)]
    External(ExternalError),

    /// Configuration or storage failures owned by this process.
    #[error(transparent)]
    Infrastructure(InfrastructureError),
}

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    #[error("{provider} protocol error: {message}")]
    Protocol { provider: String, message: String },
}

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.kind {
            AppErrorKind::Validation { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            AppErrorKind::Auth { .. } => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppErrorKind::External(ExternalError::Unavailable { .. }) => {
                (StatusCode::BAD_GATEWAY, "upstream_unavailable")
            }
            AppErrorKind::External(ExternalError::Protocol { .. }) => {
                (StatusCode::BAD_GATEWAY, "upstream_protocol_error")
            }
            AppErrorKind::Infrastructure(InfrastructureError::Configuration { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "not_configured")
            }
            AppErrorKind::Infrastructure(InfrastructureError::Storage { .. }) => {
                (StatusCode::BAD_GATEWAY, "storage_unavailable")
            }
        };

        let body = serde_json::json!({
            "error": code,
            "detail": self.to_string(),
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}
