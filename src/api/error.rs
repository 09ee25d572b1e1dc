use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use thiserror::Error;

use super::Envelope;

pub const CODE_INTERNAL: i32 = 1;
pub const CODE_MALFORMED: i32 = 2;
pub const CODE_DUPLICATE_TEXT: i32 = 10001;
pub const CODE_TEXT_TOO_LONG: i32 = 10002;
pub const CODE_UNKNOWN_PHRASE: i32 = 10003;
pub const CODE_INVALID_VALUE: i32 = 10004;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("An existing item already exists")]
    DuplicateText,

    #[error("Maximum {max_chars} characters")]
    TextTooLong { max_chars: usize },

    #[error("Phrase {0} not found")]
    UnknownPhrase(i64),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            ApiError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, CODE_MALFORMED),
            ApiError::DuplicateText => (StatusCode::BAD_REQUEST, CODE_DUPLICATE_TEXT),
            ApiError::TextTooLong { .. } => (StatusCode::BAD_REQUEST, CODE_TEXT_TOO_LONG),
            ApiError::UnknownPhrase(_) => (StatusCode::NOT_FOUND, CODE_UNKNOWN_PHRASE),
            ApiError::InvalidValue(_) => (StatusCode::BAD_REQUEST, CODE_INVALID_VALUE),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if let ApiError::Internal(err) = &self {
            error!("request failed: {err:#}");
        }

        let body = Envelope {
            c: code,
            d: "",
            m: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
