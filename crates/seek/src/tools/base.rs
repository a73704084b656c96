use async_trait::async_trait;

use crate::errors::ToolResult;

pub const SUCCESS_FEEDBACK: &str = "[success] Execution success, code output:\n";
pub const FAILURE_FEEDBACK: &str = "[failure] Error in execution:\n";

/// Executes one unit of extracted code. Stateless per invocation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Language tag of the fenced blocks this tool runs
    fn tag(&self) -> &str;

    fn description(&self) -> &str;

    /// Run `code` and return its captured output. `Err` means the tool could not
    /// run the code at all; a program that ran and failed is judged by `failed`.
    async fn execute(&self, code: &str) -> ToolResult<String>;

    /// Tool-specific check for an error marker in the captured output
    fn failed(&self, output: &str) -> bool;

    /// Text fed back to the model as context for its next turn
    fn feedback(&self, output: &str) -> String {
        if self.failed(output) {
            format!("{}{}", FAILURE_FEEDBACK, output)
        } else {
            format!("{}{}", SUCCESS_FEEDBACK, output)
        }
    }
}

/// Feedback for a block whose tool raised instead of producing output
pub fn error_feedback(message: &str) -> String {
    format!("{}{}", FAILURE_FEEDBACK, message)
}
