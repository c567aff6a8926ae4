//! HTTP error mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use carbonflow_marketplace_models::ValidationError;
use carbonflow_server_models::ApiErrorBody;
use thiserror::Error;

/// An error answered with a status code and a `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was missing data or carried invalid values.
    #[error("{0}")]
    BadRequest(String),

    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A third-party service failed.
    #[error("{0}")]
    Upstream(String),

    /// Something failed on our side. The message is safe to show clients;
    /// details are logged where the error is raised.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Logs `cause` and returns an [`ApiError::Internal`] carrying only
    /// `message`.
    pub fn internal(message: &str, cause: impl std::fmt::Display) -> Self {
        log::error!("{message}: {cause}");
        Self::Internal(message.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody {
            error: self.to_string(),
        })
    }
}
