use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Error type shared by every inventory operation and HTTP handler.
///
/// Display is the bare message, which the dashboard and the scanner page
/// show to the operator as-is. The `code` next to it never changes:
///
/// ```json
/// {"error": "caixa 'C6009' não encontrada", "code": "NOT_FOUND"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No box, cable type or project with that id or code.
    #[error("{0}")]
    NotFound(String),

    /// A unique key (cable type prefix, box code) is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// The box status does not allow the requested operation, or another
    /// request changed the box first.
    #[error("{0}")]
    InvalidTransition(String),

    /// The path exists but does not accept this HTTP method.
    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

/// Wire shape of an error response.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
}

impl ServiceError {
    /// Wrap a lower-level storage failure (SQL, blob, I/O).
    pub fn storage(err: impl Display) -> Self {
        ServiceError::Storage(err.to_string())
    }

    /// HTTP status and stable machine-readable code.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            ServiceError::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            ServiceError::MethodNotAllowed(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED")
            }
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        let cases = [
            (ServiceError::NotFound("x".into()), 404, "NOT_FOUND"),
            (ServiceError::Conflict("x".into()), 409, "ALREADY_EXISTS"),
            (ServiceError::Validation("x".into()), 400, "VALIDATION_FAILED"),
            (ServiceError::InvalidTransition("x".into()), 409, "INVALID_TRANSITION"),
            (ServiceError::MethodNotAllowed("x".into()), 405, "METHOD_NOT_ALLOWED"),
            (ServiceError::Storage("x".into()), 500, "STORAGE_ERROR"),
            (ServiceError::Internal("x".into()), 500, "INTERNAL"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.classify(), (StatusCode::from_u16(status).unwrap(), code));
        }
    }

    #[test]
    fn storage_helper_keeps_message() {
        let err = ServiceError::storage(std::io::Error::other("disk full"));
        assert!(matches!(&err, ServiceError::Storage(m) if m == "disk full"));
    }

    #[tokio::test]
    async fn json_body_has_error_and_code() {
        let resp = ServiceError::InvalidTransition("caixa C6001 não está aberta".into())
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "caixa C6001 não está aberta");
        assert_eq!(json["code"], "INVALID_TRANSITION");
    }
}
