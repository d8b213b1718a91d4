//! # Centralized Error Handling
//!
//! This module provides a unified error handling system for the HTTP layer.
//! It centralizes error logging and HTTP response generation so handlers can
//! simply return [`AppResult`].
//!
//! Every error response has the shape `{"status": "error", "message": ...}`.
//! Only tagged errors ([`AppError::Status`], [`AppError::RouteNotFound`])
//! expose their message; everything else becomes a generic 500.

use std::any::Any;

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::services::database::DatabaseError;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Central application error type.
///
/// Errors are logged once, when they are turned into a response. The
/// request span opened by the request logger supplies method and path.
#[derive(Error, Debug)]
pub enum AppError {
    /// Tagged application error carrying its own status code.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Route {method} {path} not found")]
    RouteNotFound { method: Method, path: String },

    #[error("database error")]
    Database(#[from] DatabaseError),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates a tagged application error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Status {
            status,
            message: message.into(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

/// Response extension carrying the logged error message, picked up by the
/// request logger.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::Status { status, message } => {
                error!(status = status.as_u16(), %message, "Application error");
                (status, message.clone(), message)
            }
            AppError::RouteNotFound { method, path } => {
                let message = format!("Route {method} {path} not found");
                (StatusCode::NOT_FOUND, message.clone(), message)
            }
            AppError::Database(e) => {
                error!(error = ?e, "Unexpected database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    e.to_string(),
                )
            }
            AppError::Internal(detail) => {
                error!(%detail, "Unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    detail,
                )
            }
        };

        let body = Json(ErrorBody {
            status: "error".to_string(),
            message,
        });
        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorMessage(detail));
        response
    }
}

/// Turns a panic caught inside a handler into the generic 500 response.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal(format!("handler panicked: {}", panic_message(&*payload))).into_response()
}

/// Extracts the human-readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Convenience Result type alias that uses AppError as the error type.
pub type AppResult<T> = Result<T, AppError>;
