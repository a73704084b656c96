use super::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use seek::errors::InteractionError;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveResponse {
    is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    status: String,
}

async fn is_active(State(state): State<AppState>) -> Json<ActiveResponse> {
    Json(ActiveResponse {
        is_active: state.interaction.is_active(),
    })
}

async fn stop(State(state): State<AppState>) -> Json<StopResponse> {
    info!("stop requested");
    state.interaction.request_stop();
    Json(StopResponse {
        status: "stopped".to_string(),
    })
}

async fn latest_answer(State(state): State<AppState>) -> impl IntoResponse {
    match state.interaction.poll_latest_answer() {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(InteractionError::NoAnswer) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(InteractionError::NoAnswer.to_string())),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to read the latest answer");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/is_active", get(is_active))
        .route("/api/stop", get(stop))
        .route("/api/latest_answer", get(latest_answer))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{get as get_request, json_body, state_with};
    use seek::providers::mock::MockProvider;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_is_active_and_stop() {
        let state = state_with(MockProvider::repeating("hi"));
        let app = routes(state.clone());

        let response = app.clone().oneshot(get_request("/api/is_active")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["is_active"], true);

        let response = app.clone().oneshot(get_request("/api/stop")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "stopped");

        state.interaction.shutdown();
        let response = app.oneshot(get_request("/api/is_active")).await.unwrap();
        assert_eq!(json_body(response).await["is_active"], false);
    }

    #[tokio::test]
    async fn test_latest_answer_before_and_after_a_query() {
        let state = state_with(MockProvider::repeating("hello!"));
        let app = routes(state.clone());

        let response = app.clone().oneshot(get_request("/api/latest_answer")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "No answer available");

        state.interaction.ask("hi").await.unwrap();

        let first = json_body(app.clone().oneshot(get_request("/api/latest_answer")).await.unwrap()).await;
        let second = json_body(app.oneshot(get_request("/api/latest_answer")).await.unwrap()).await;
        assert_eq!(first["answer"], "hello!");
        assert_eq!(first["done"], true);
        assert_eq!(first, second);
    }
}
