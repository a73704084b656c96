use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{ToolError, ToolResult};

/// Captured result of one finished subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, plus an exit marker when the process failed
    pub fn render(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        if !self.success() {
            if !text.is_empty() {
                text.push('\n');
            }
            match self.exit_code {
                Some(code) => text.push_str(&format!("execution failed with exit code {}", code)),
                None => text.push_str("execution failed: terminated by signal"),
            }
        }
        text
    }
}

/// Run `command` to completion, killing it if it outlives `timeout`
pub async fn run(mut command: Command, program: &str, timeout: Duration) -> ToolResult<CommandOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| ToolError::Spawn {
        program: program.to_string(),
        reason: if e.kind() == ErrorKind::NotFound {
            format!("{} is not installed or not in PATH", program)
        } else {
            e.to_string()
        },
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => return Err(ToolError::Timeout(timeout.as_secs())),
    };

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    };
    debug!(program, exit_code = ?result.exit_code, "process finished");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_success() {
        let output = CommandOutput {
            stdout: "10\n".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        };
        assert_eq!(output.render(), "10");
    }

    #[test]
    fn test_render_failure_appends_marker() {
        let output = CommandOutput {
            stdout: "partial\n".to_string(),
            stderr: "boom\n".to_string(),
            exit_code: Some(2),
        };
        assert_eq!(output.render(), "partial\nboom\nexecution failed with exit code 2");
    }

    #[tokio::test]
    async fn test_run_captures_both_streams() -> anyhow::Result<()> {
        let mut command = Command::new("bash");
        command.arg("-c").arg("echo out; echo err >&2; exit 3");
        let output = run(command, "bash", Duration::from_secs(10)).await?;
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let mut command = Command::new("bash");
        command.arg("-c").arg("sleep 5");
        let result = run(command, "bash", Duration::from_millis(200)).await;
        assert!(matches!(result, Err(ToolError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let command = Command::new("definitely-not-a-real-binary-4242");
        let err = run(command, "definitely-not-a-real-binary-4242", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not installed or not in PATH"));
    }
}
