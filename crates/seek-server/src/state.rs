use seek::interaction::Interaction;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub interaction: Arc<Interaction>,
}

impl AppState {
    pub fn new(interaction: Arc<Interaction>) -> Self {
        Self { interaction }
    }
}
