//! HTTP error boundary.
//!
//! Every handler fault ends here and is converted into a JSON 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use faultline_core::{FaultlineError, UnhandledFault};

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
pub const UNHANDLED_EXCEPTION: &str = "Unhandled Exception";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Infrastructure fault (metrics export, registry misuse, ...).
    #[error(transparent)]
    Internal(#[from] FaultlineError),
    /// The simulated unhandled fault from the failure generator.
    #[error(transparent)]
    Unhandled(#[from] UnhandledFault),
}

impl ApiError {
    /// Stable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Internal(e) => e.client_code().as_str(),
            ApiError::Unhandled(_) => "UNHANDLED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(code = self.code(), error = %self, "request failed");
        let error = match self {
            ApiError::Internal(_) => INTERNAL_SERVER_ERROR,
            ApiError::Unhandled(_) => UNHANDLED_EXCEPTION,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error }))).into_response()
    }
}
