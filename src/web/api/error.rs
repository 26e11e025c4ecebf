use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::elements::FormatError;
use crate::predict::PredictError;
use crate::tracker::{ActuatorError, TrackingError};
use crate::web::auth::PermissionError;

#[derive(Debug)]
pub enum ApiError {
    Permission(PermissionError),
    Validation(String),
    NotFound(&'static str),
    Unavailable(String),
    Actuator(ActuatorError),
    Internal(String),
}

impl From<PermissionError> for ApiError {
    fn from(e: PermissionError) -> Self {
        ApiError::Permission(e)
    }
}

impl From<FormatError> for ApiError {
    fn from(e: FormatError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::SiteNotSet => ApiError::Unavailable(e.to_string()),
            _ => ApiError::Validation(e.to_string()),
        }
    }
}

impl From<ActuatorError> for ApiError {
    fn from(e: ActuatorError) -> Self {
        ApiError::Actuator(e)
    }
}

impl From<TrackingError> for ApiError {
    fn from(e: TrackingError) -> Self {
        match e {
            TrackingError::Actuator(e) => ApiError::Actuator(e),
            _ => ApiError::Validation(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Permission(e) => e.into_response(),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("validation_failed", &msg)),
            )
                .into_response(),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(what))).into_response()
            }
            ApiError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::with_message("unavailable", &msg)),
            )
                .into_response(),
            ApiError::Actuator(e) => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::with_message("mount_error", &e.to_string())),
            )
                .into_response(),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_message("internal_error", &msg)),
            )
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn status(e: impl Into<ApiError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status(FormatError::LineCount(2)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(PredictError::InvalidRange("stop before start".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(PredictError::SiteNotSet), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status(TrackingError::Elapsed(Utc::now())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(TrackingError::Actuator(ActuatorError::NotConnected)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(ApiError::NotFound("action_not_found")), StatusCode::NOT_FOUND);
        assert_eq!(status(PermissionError), StatusCode::FORBIDDEN);
    }
}
