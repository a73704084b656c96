pub mod base;
pub mod canned;
pub mod configs;
pub mod factory;
pub mod google;
pub mod llm;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod utils;
