use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    tracing::debug!("health check");
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn routes() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{get as get_request, json_body};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = routes();
        for uri in ["/", "/api/health"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        }
    }
}
