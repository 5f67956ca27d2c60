use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use tracing::debug;

use super::error_responses::GatewayError;

pub async fn not_found(uri: Uri) -> GatewayError {
    debug!(path = %uri.path(), "gateway router: not_found handler invoked");
    GatewayError::NotFound("not found".to_string())
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn fallback_renders_not_found_envelope() {
        let response = not_found(Uri::from_static("/nope")).await.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), br#"{"ok":false,"error":"not found"}"#);
    }
}
