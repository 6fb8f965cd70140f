use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::errors::ServiceError;

impl ServiceError {
    fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::DuplicateEmail => "EMAIL_ALREADY_EXISTS",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::InvalidCredentials => "INVALID_CREDENTIALS",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::Forbidden => "FORBIDDEN",
            ServiceError::Upload(_) => "UPLOAD_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::DuplicateEmail | ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::InvalidCredentials | ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Upload(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": message,
            "code": self.code(),
        }))
    }
}
