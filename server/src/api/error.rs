//! HTTP error response conversion
//!
//! Errors render as plain text: the message followed by a newline, with the status code
//! carrying the error class. Drones and pilots match on these bodies, so they are stable.

use crate::error::DispatchError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use dispatch_shared::messages;
use std::fmt;

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, messages::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, messages::METHOD_NOT_ALLOWED)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DispatchError> for HttpError {
    fn from(err: DispatchError) -> Self {
        let status = match &err {
            DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::AlreadyQueued(_) => StatusCode::CONFLICT,
            DispatchError::RegistrationTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            DispatchError::NotFound(_)
            | DispatchError::NoAvailableWorkers
            | DispatchError::EncodingFailure(_)
            | DispatchError::WorkerGone(_)
            | DispatchError::Cancelled(_)
            | DispatchError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::warn!(status = %self.status, error = %self.message, "Request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "Request rejected");
        }

        let mut response = (self.status, format!("{}\n", self.message)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response
    }
}
