use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model file not found at {0}")]
    ModelNotFound(PathBuf),
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
    #[error("invalid label set: {0}")]
    Labels(String),
    #[error("model predicts {actual} classes but {expected} labels are configured")]
    OutputMismatch { expected: usize, actual: usize },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to build input tensor: {0}")]
    Tensor(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The AI model is not available: {0}")]
    ModelUnavailable(String),
    #[error("No image file was sent.")]
    MissingFile,
    #[error("Malformed upload: {0}")]
    BadRequest(String),
    #[error("Image exceeds the {0} byte upload limit.")]
    PayloadTooLarge(usize),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::MissingFile | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            ApiError::ModelUnavailable("missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::PayloadTooLarge(10).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn classifier_errors_become_internal_with_text() {
        let err: ApiError = ClassifierError::Inference("shape mismatch".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal error: inference failed: shape mismatch");
    }
}
