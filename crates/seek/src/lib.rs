pub mod agent;
pub mod errors;
pub mod interaction;
pub mod key_manager;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod router;
pub mod tools;
