//! Serves the generated OpenAPI document.

use axum::{response::IntoResponse, Json};

/// Return the OpenAPI document for this service.
///
/// Left out of the document itself, like the other meta routes.
pub async fn openapi_json() -> impl IntoResponse {
    Json(super::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::CONTENT_TYPE, StatusCode};

    #[tokio::test]
    async fn document_is_served_as_json() {
        let response = openapi_json().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/json")
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json document");
        assert_eq!(value["info"]["title"], env!("CARGO_PKG_NAME"));
        assert!(value["paths"].get("/api/auth/login").is_some());
    }
}
