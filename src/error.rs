use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::model::InferenceError;

/// Per-request failures, translated into the JSON error envelope at the
/// endpoint boundary. Startup failures (`ArtifactLoadError`) are not here on
/// purpose; they abort the process before any request is accepted.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
