use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::RegexSet;
use tokio::process::Command;

use super::base::Tool;
use super::process;
use crate::errors::ToolResult;

lazy_static! {
    static ref ERROR_MARKERS: RegexSet = RegexSet::new([
        r"Traceback \(most recent call last\)",
        r"(?m)^\w*(Error|Exception)\b",
        r"(?i)execution failed",
    ])
    .expect("python error patterns are valid");
}

pub struct PyInterpreter {
    work_dir: PathBuf,
    program: String,
    timeout: Duration,
}

impl PyInterpreter {
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.into(),
            program: "python3".to_string(),
            timeout: super::bash::DEFAULT_TIMEOUT,
        }
    }

    /// Use a different interpreter binary, e.g. a virtualenv's python
    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for PyInterpreter {
    fn tag(&self) -> &str {
        "python"
    }

    fn description(&self) -> &str {
        "Execute a python script"
    }

    async fn execute(&self, code: &str) -> ToolResult<String> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let mut command = Command::new(&self.program);
        command.arg("-c").arg(code).current_dir(&self.work_dir);
        Ok(process::run(command, &self.program, self.timeout).await?.render())
    }

    fn failed(&self, output: &str) -> bool {
        ERROR_MARKERS.is_match(output)
    }
}
