//! Mapping from core error kinds onto HTTP responses

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use common::prelude::ErrorKind;

/// JSON body of every API error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Crypto => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Sealed => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn respond(status: StatusCode, kind: &str, message: impl ToString) -> Response {
    let body = ErrorBody {
        kind: kind.to_string(),
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Response for a core error of the given kind
pub fn from_kind(kind: ErrorKind, message: impl ToString) -> Response {
    let message = message.to_string();
    if kind == ErrorKind::Storage {
        tracing::error!(error = %message, "request failed");
    }
    respond(status_for(kind), kind.as_str(), message)
}
