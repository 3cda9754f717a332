//! Error responses
//!
//! Every failure is returned as `{"error": "<message>"}` with a status
//! derived from the error kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::Error;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::PartialCompaction { .. }
            | Error::Storage(_)
            | Error::Media(_)
            | Error::Notification(_)
            | Error::Config(_)
            | Error::SerializationError(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Server-side failures keep their detail in
    /// the log only.
    fn public_message(&self) -> String {
        match self {
            Error::NotFound(what) => format!("{} not found", what.trim_end_matches(" not found")),
            Error::Conflict(msg)
            | Error::InvalidArgument(msg)
            | Error::PayloadTooLarge(msg)
            | Error::Unauthorized(msg)
            | Error::Forbidden(msg) => msg.clone(),
            Error::PartialCompaction { table, .. } => {
                format!("Renumbering of '{}' did not complete; the table needs repair", table)
            }
            Error::Media(msg) => format!("Media processing failed: {}", msg),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
