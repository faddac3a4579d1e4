use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    ConfigMissing(String),
    ConfigInvalid { var: String, reason: String },
    CorsRejected(String),
    InvalidRequest(String),
    MissingField(&'static str),
    DuplicateEmail(String),
    NotFound(String),
    InvalidCredentials,
    Unauthorized,
    StoreUnavailable(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConfigMissing(var) => {
                write!(f, "Missing required environment variable: {}", var)
            }
            AppError::ConfigInvalid { var, reason } => {
                write!(f, "Invalid value for environment variable {}: {}", var, reason)
            }
            AppError::CorsRejected(origin) => write!(f, "Origin not allowed by CORS: {}", origin),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::MissingField(field) => write!(f, "Missing required field: {}", field),
            AppError::DuplicateEmail(email) => write!(f, "Email already registered: {}", email),
            AppError::NotFound(what) => write!(f, "Not found: {}", what),
            AppError::InvalidCredentials => write!(f, "Invalid credentials"),
            AppError::Unauthorized => write!(f, "Login required"),
            AppError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ConfigMissing(_) | AppError::ConfigInvalid { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::CorsRejected(_) => StatusCode::FORBIDDEN,
            AppError::InvalidRequest(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string()
        }))
    }
}
