use std::fmt;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::gateway::{self, GatewayResponse};
use crate::i18n::Messages;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Everything wrong with an input payload, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.0.first()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("user already exists")]
    Conflict,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{e:#}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> u16 {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::Conflict => 400,
            AppError::InvalidCredentials => 401,
            AppError::MethodNotAllowed => 405,
            AppError::Database(_) | AppError::Internal(_) => 500,
        }
    }

    /// Renders the error as a gateway response. Store and internal failures are
    /// logged in full and reported to the client with a generic message.
    pub fn into_response(self, messages: &Messages) -> GatewayResponse {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => {
                let message = errors.first().map(|e| e.message).unwrap_or(messages.invalid_json);
                json!({ "error": message, "fields": errors.fields() })
            }
            AppError::BadRequest(message) => json!({ "error": message }),
            AppError::Conflict => json!({ "error": messages.user_exists }),
            AppError::InvalidCredentials => json!({ "error": messages.invalid_credentials }),
            AppError::MethodNotAllowed => json!({ "error": messages.method_not_allowed }),
            AppError::Database(_) | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                json!({ "error": messages.internal })
            }
        };
        if status < 500 {
            debug!(status, error = %self, "request rejected");
        }
        gateway::json(status, body)
    }
}
