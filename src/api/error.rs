use crate::error::StreamError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    Stream(#[from] StreamError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Rejected ingest body
    pub fn invalid_payload(details: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: "Invalid payload".to_string(),
            details: Some(Value::String(details.into())),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_payload(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::BadRequest { message, details } => (StatusCode::BAD_REQUEST, message, details),
            ApiError::Stream(e) if e.is_client_error() => (
                StatusCode::BAD_REQUEST,
                "Invalid payload".to_string(),
                Some(Value::String(e.to_string())),
            ),
            ApiError::Stream(e) => {
                tracing::error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
            }
            ApiError::Internal(reason) => {
                tracing::error!("Request failed: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, reason, None)
            }
        };
        let body = Json(ErrorBody {
            success: false,
            message,
            details,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
