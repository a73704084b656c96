use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::base::Tool;
use super::process;
use crate::errors::ToolResult;

pub const TIMEOUT: Duration = Duration::from_secs(30);

const ERROR_INDICATORS: &[&str] = &[
    "error:",
    "syntaxerror",
    "referenceerror",
    "typeerror",
    "rangeerror",
    "evalerror",
    "urierror",
    "execution failed",
    "not installed",
    "not in path",
    "timed out",
];

/// Runs JavaScript blocks with node
pub struct JavaScriptInterpreter {
    work_dir: PathBuf,
    timeout: Duration,
}

impl JavaScriptInterpreter {
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: TIMEOUT,
        }
    }
}

#[async_trait]
impl Tool for JavaScriptInterpreter {
    fn tag(&self) -> &str {
        "javascript"
    }

    fn description(&self) -> &str {
        "Execute JavaScript code with Node.js"
    }

    async fn execute(&self, code: &str) -> ToolResult<String> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let mut command = Command::new("node");
        command.arg("-e").arg(code).current_dir(&self.work_dir);
        Ok(process::run(command, "node", self.timeout).await?.render())
    }

    fn failed(&self, output: &str) -> bool {
        let output = output.to_lowercase();
        ERROR_INDICATORS.iter().any(|marker| output.contains(marker))
    }

    fn feedback(&self, output: &str) -> String {
        if self.failed(output) {
            format!("[failure] JavaScript execution error:\n{}", output)
        } else {
            format!("[success] JavaScript executed successfully:\n{}", output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_detection_and_feedback() {
        let js = JavaScriptInterpreter::new(".");
        let output = "ReferenceError: foo is not defined";
        assert!(js.failed(output));
        assert_eq!(
            js.feedback(output),
            "[failure] JavaScript execution error:\nReferenceError: foo is not defined"
        );
        assert!(!js.failed("42"));
        assert_eq!(js.feedback("42"), "[success] JavaScript executed successfully:\n42");
    }
}
