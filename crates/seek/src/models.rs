//! These models represent the objects passed between the agent, its tools and the providers
//!
//! - messages and the memory they form, sent as-is to the backend
//! - fenced code blocks parsed out of a model reply
//! - execution results produced when a tool runs one of those blocks
pub mod block;
pub mod memory;
pub mod message;
