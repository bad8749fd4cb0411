use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::ServiceError;

/// `Json<T>` whose rejections come back as [`ServiceError::Validation`].
///
/// Axum's own rejection answers with a plain-text body; the clients only
/// know how to display `{"error": ...}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ServiceError::Validation(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    #[derive(serde::Deserialize)]
    struct Payload {
        quantidade: f64,
    }

    async fn echo(JsonBody(p): JsonBody<Payload>) -> impl IntoResponse {
        axum::Json(serde_json::json!({ "quantidade": p.quantidade }))
    }

    async fn send(body: &str) -> (StatusCode, serde_json::Value) {
        let router = Router::new().route("/echo", post(echo));
        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let (status, json) = send(r#"{"quantidade": 12.5}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quantidade"], 12.5);
    }

    #[tokio::test]
    async fn rejection_is_json_validation_error() {
        let (status, json) = send(r#"{"quantidade": null}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_FAILED");
        assert!(json["error"].as_str().unwrap().len() > 0);
    }
}
