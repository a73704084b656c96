use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::RegexSet;
use tokio::process::Command;

use super::base::Tool;
use super::{process, safety};
use crate::errors::{ToolError, ToolResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

lazy_static! {
    static ref ERROR_MARKERS: RegexSet = RegexSet::new([
        r"(?i)command not found",
        r"(?i)no such file or directory",
        r"(?i)permission denied",
        r"(?i)syntax error",
        r"(?i)execution failed",
        r"(?i)segmentation fault",
        r"(?i)core dumped",
        r"(?i)\berrno\b",
        r"(?i)\b(unrecognized|invalid) option\b",
        r"(?i)cannot (access|open|create|remove)",
    ])
    .expect("bash error patterns are valid");
}

/// Runs shell blocks with `bash -c` inside the agent's work directory
pub struct BashInterpreter {
    work_dir: PathBuf,
    timeout: Duration,
    allow_language_exec: bool,
}

impl BashInterpreter {
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            allow_language_exec: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Let shell blocks start other language interpreters directly
    pub fn allow_language_exec(mut self, allow: bool) -> Self {
        self.allow_language_exec = allow;
        self
    }
}

#[async_trait]
impl Tool for BashInterpreter {
    fn tag(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run shell commands in the working directory"
    }

    async fn execute(&self, code: &str) -> ToolResult<String> {
        if code.trim().is_empty() {
            return Err(ToolError::InvalidInput("empty bash block".to_string()));
        }
        if safety::is_destructive(code) {
            return Err(ToolError::Disallowed(
                "the block contains a destructive command".to_string(),
            ));
        }
        if !self.allow_language_exec {
            if let Some(line) = safety::interpreter_launch(code) {
                return Err(ToolError::Disallowed(format!(
                    "'{}' starts another interpreter, write that code in its own block",
                    line
                )));
            }
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let mut command = Command::new("bash");
        command.arg("-c").arg(code).current_dir(&self.work_dir);
        Ok(process::run(command, "bash", self.timeout).await?.render())
    }

    fn failed(&self, output: &str) -> bool {
        ERROR_MARKERS.is_match(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn interpreter() -> (TempDir, BashInterpreter) {
        let dir = tempfile::tempdir().unwrap();
        let bash = BashInterpreter::new(dir.path());
        (dir, bash)
    }

    #[tokio::test]
    async fn test_echo_succeeds() -> anyhow::Result<()> {
        let (_dir, bash) = interpreter();
        let output = bash.execute("echo $((5+5))").await?;
        assert_eq!(output, "10");
        assert!(!bash.failed(&output));
        assert_eq!(
            bash.feedback(&output),
            "[success] Execution success, code output:\n10"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_runs_in_work_dir() -> anyhow::Result<()> {
        let (dir, bash) = interpreter();
        bash.execute("echo hello > note.txt").await?;
        assert_eq!(std::fs::read_to_string(dir.path().join("note.txt"))?, "hello\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_failure() -> anyhow::Result<()> {
        let (_dir, bash) = interpreter();
        let output = bash.execute("cat /definitely/missing/file").await?;
        assert!(bash.failed(&output));
        assert!(bash.feedback(&output).starts_with("[failure] Error in execution:"));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() -> anyhow::Result<()> {
        let (_dir, bash) = interpreter();
        let output = bash.execute("exit 4").await?;
        assert!(output.contains("exit code 4"));
        assert!(bash.failed(&output));
        Ok(())
    }

    #[tokio::test]
    async fn test_refuses_destructive_and_interpreter_commands() {
        let (_dir, bash) = interpreter();
        assert!(matches!(
            bash.execute("rm -rf /").await,
            Err(ToolError::Disallowed(_))
        ));
        assert!(matches!(
            bash.execute("python3 -c 'print(1)'").await,
            Err(ToolError::Disallowed(_))
        ));
        assert!(matches!(bash.execute("  ").await, Err(ToolError::InvalidInput(_))));
    }
}
