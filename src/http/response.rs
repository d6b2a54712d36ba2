//! Error-to-response mapping.
//!
//! # Design Decisions
//! - Business errors map to 4xx with the error message as JSON
//! - Store faults map to 500 and are logged; the body stays generic

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::RouterError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON error response with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

impl RouterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::InvalidInput(_) | RouterError::NoFieldsProvided => StatusCode::BAD_REQUEST,
            RouterError::DuplicateRuleId(_) => StatusCode::CONFLICT,
            RouterError::NotFound(_) => StatusCode::NOT_FOUND,
            RouterError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Rule store failure");
            return error_response(status, "internal store error");
        }
        error_response(status, self.to_string())
    }
}
