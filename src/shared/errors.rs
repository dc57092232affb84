use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Envelope status codes carried in every 200 body.
pub const STATUS_FAILURE: i32 = 0;
pub const STATUS_SUCCESS: i32 = 1;
pub const STATUS_WARNING: i32 = 2;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("system error: {0}")]
    System(String),
}

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(entity.to_string())
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Self::NotFound("record".to_string()),
            other => Self::System(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        Self::System(format!("database pool: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": STATUS_FAILURE,
            "message": self.to_string(),
            "data": serde_json::Value::Null,
        }));
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, body).into_response(),
            Self::Forbidden(_) => (StatusCode::METHOD_NOT_ALLOWED, body).into_response(),
            Self::System(ref msg) => {
                error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
            _ => (StatusCode::OK, body).into_response(),
        }
    }
}

pub type ApiResult = Result<Json<serde_json::Value>, AppError>;

/// Success envelope.
pub fn ok<T: serde::Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({
        "status": STATUS_SUCCESS,
        "message": "success",
        "data": data,
    }))
}

/// Warning envelope, used when a response was assembled with parts skipped.
pub fn warning<T: serde::Serialize>(message: &str, data: T) -> Json<serde_json::Value> {
    Json(json!({
        "status": STATUS_WARNING,
        "message": message,
        "data": data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shapes() {
        let body = ok(serde_json::json!({"id": 7}));
        assert_eq!(body.0["status"], STATUS_SUCCESS);
        assert_eq!(body.0["message"], "success");
        assert_eq!(body.0["data"]["id"], 7);

        let body = warning("partial", serde_json::Value::Null);
        assert_eq!(body.0["status"], STATUS_WARNING);
        assert_eq!(body.0["message"], "partial");
    }

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let err: AppError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
