use super::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use seek::errors::InteractionError;
use seek::interaction::QueryRecord;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    query: String,
}

async fn process_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    if request.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Query must not be empty")),
        )
            .into_response();
    }
    info!(query = %request.query, "processing query");

    let handle = match state.interaction.submit(request.query) {
        Ok(handle) => handle,
        Err(InteractionError::Busy) => {
            warn!("another query is being processed");
            return (StatusCode::TOO_MANY_REQUESTS, Json(QueryRecord::busy())).into_response();
        }
        Err(e) => return internal_error(e),
    };

    // The query keeps running if the client goes away; its record still lands
    // in the history.
    match handle.wait().await {
        Ok(record) if record.success => (StatusCode::OK, Json(record)).into_response(),
        Ok(record) => (StatusCode::BAD_REQUEST, Json(record)).into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: InteractionError) -> axum::response::Response {
    error!(error = %e, "query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!(
            "An unexpected error occurred: {}",
            e
        ))),
    )
        .into_response()
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/query", post(process_query))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{json_body, post_json, state_with};
    use seek::interaction::NO_ANSWER;
    use seek::providers::mock::MockProvider;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_successful_query() {
        let app = routes(state_with(MockProvider::repeating("hello!")));

        let response = app
            .oneshot(post_json("/api/query", json!({"query": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["done"], true);
        assert_eq!(body["success"], true);
        assert_eq!(body["answer"], "hello!");
        assert_eq!(body["agent_name"], "tester");
        assert!(body["uid"].as_str().is_some_and(|uid| !uid.is_empty()));
    }

    #[tokio::test]
    async fn test_failed_query_is_bad_request() {
        let app = routes(state_with(MockProvider::failing("offline")));

        let response = app
            .oneshot(post_json("/api/query", json!({"query": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["answer"], NO_ANSWER);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_busy_query_is_rejected() {
        let state = state_with(
            MockProvider::repeating("slow").with_delay(Duration::from_millis(300)),
        );
        let app = routes(state.clone());

        let running = state.interaction.submit("first").unwrap();
        let response = app
            .oneshot(post_json("/api/query", json!({"query": "second"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(response).await;
        assert_eq!(body["done"], false);
        assert_eq!(body["agent_name"], "Unknown");

        assert!(running.wait().await.unwrap().success);
        assert_eq!(state.interaction.history().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_query() {
        let app = routes(state_with(MockProvider::repeating("unused")));
        let response = app
            .oneshot(post_json("/api/query", json!({"query": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
