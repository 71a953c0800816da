use crate::error::AppError;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ValidationResponse {
    pub status: String,
    pub errors: HashMap<String, Vec<String>>,
}

/// Error side of every JSON API handler.
pub type ApiError = Custom<Json<ValidationResponse>>;
pub type ApiResult<T> = Result<T, ApiError>;

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

pub trait ToValidationResponse {
    fn to_validation_response(self) -> ApiError;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        self.log_and_record("API validation error");
        let status = self.status_code();

        let (field, message) = match &self {
            AppError::Database(_) => ("database", "A database error occurred".to_string()),
            AppError::Authentication(msg) => ("authentication", msg.clone()),
            AppError::Authorization(msg) => ("authorization", format!("Permission denied: {}", msg)),
            AppError::NotFound(msg) => ("resource", msg.clone()),
            AppError::Validation(msg) => ("validation", msg.clone()),
            AppError::Conflict(msg) => ("resource", msg.clone()),
            AppError::ExternalService(msg) => ("service", format!("Service error: {}", msg)),
            AppError::Internal(_) => ("server", "Internal server error".to_string()),
        };

        Custom(status, Json(ValidationResponse::with_error(field, &message)))
    }
}

impl ToValidationResponse for Status {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        let (field, message) = match self.code {
            403 => (
                "permission",
                "You don't have permission to perform this action",
            ),
            401 => ("authentication", "Authentication required"),
            404 => ("resource", "Resource not found"),
            409 => ("resource", "Resource already exists"),
            400 => ("request", "Bad request"),
            422 => ("validation", "Validation failed"),
            503 => ("service", "Service unavailable"),
            _ => ("server", "Internal server error"),
        };

        Custom(self, Json(ValidationResponse::with_error(field, message)))
    }
}

impl From<validator::ValidationErrors> for ValidationResponse {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let error_messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                })
                .collect();

            error_map.insert(field.to_string(), error_messages);
        }

        Self::new(error_map)
    }
}

/// Validates a JSON body before any store call is made.
pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> ApiResult<T>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validate_custom(self) -> ApiResult<T> {
        let inner = self.into_inner();
        match inner.validate() {
            Ok(()) => Ok(inner),
            Err(errors) => Err(Custom(
                Status::UnprocessableEntity,
                Json(ValidationResponse::from(errors)),
            )),
        }
    }
}

pub trait AppErrorExt<T> {
    fn validate_custom(self) -> ApiResult<T>;
}

impl<T> AppErrorExt<T> for Result<T, AppError> {
    fn validate_custom(self) -> ApiResult<T> {
        self.map_err(ToValidationResponse::to_validation_response)
    }
}

pub trait PermissionCheckExt<T> {
    fn validate_custom(self) -> ApiResult<T>;
}

impl<T> PermissionCheckExt<T> for Result<T, Status> {
    fn validate_custom(self) -> ApiResult<T> {
        self.map_err(ToValidationResponse::to_validation_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSessionLog;

    #[test]
    fn test_validation_errors_become_field_map() {
        let body = Json(NewSessionLog {
            trainee_id: String::new(),
            exercise_id: "ex-1".to_string(),
            actual_weight: 40.0,
            rating: Some(9),
        });

        let Custom(status, Json(response)) = body.validate_custom().unwrap_err();

        assert_eq!(status, Status::UnprocessableEntity);
        assert_eq!(response.status, "error");
        assert_eq!(
            response.errors.get("rating"),
            Some(&vec!["Rating must be between 1 and 5".to_string()])
        );
        assert!(response.errors.contains_key("trainee_id"));
    }

    #[test]
    fn test_app_errors_keep_their_status() {
        let result: Result<(), AppError> = Err(AppError::Validation(
            "Trainer already has the maximum of 4 trainees".to_string(),
        ));
        let Custom(status, Json(response)) = result.validate_custom().unwrap_err();

        assert_eq!(status, Status::UnprocessableEntity);
        assert_eq!(
            response.errors.get("validation").map(|m| m[0].as_str()),
            Some("Trainer already has the maximum of 4 trainees")
        );
    }

    #[test]
    fn test_denied_permission_maps_by_status_code() {
        let denied: Result<(), Status> = Err(Status::Forbidden);
        let Custom(status, Json(response)) = denied.validate_custom().unwrap_err();
        assert_eq!(status, Status::Forbidden);
        assert!(response.errors.contains_key("permission"));

        let Custom(status, Json(response)) = Status::ServiceUnavailable.to_validation_response();
        assert_eq!(status, Status::ServiceUnavailable);
        assert!(response.errors.contains_key("service"));

        let Custom(_, Json(response)) = Status::ImATeapot.to_validation_response();
        assert!(response.errors.contains_key("server"));
    }
}
