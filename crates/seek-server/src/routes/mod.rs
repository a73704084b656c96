// Export route modules
pub mod control;
pub mod health;
pub mod query;

use crate::state::AppState;
use axum::Router;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(control::routes(state.clone()))
        .merge(query::routes(state))
}
