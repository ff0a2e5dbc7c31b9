//! # HTTP Gateway
//!
//! Exposes the context pipeline over HTTP: `GET /api/v1/{query}` answers with
//! the assembled context as plain text, `GET /health` with a JSON status.
//! Failures are JSON bodies of the form `{"message": "..."}`.

mod server;

pub use server::{API_BASE_PATH, AppState, SharedState, router, serve};

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
