use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::RegexSet;
use tokio::process::Command;

use super::base::Tool;
use super::process;
use crate::errors::ToolResult;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

lazy_static! {
    static ref C_ERRORS: RegexSet = RegexSet::new([
        r"(?i)\berror:",
        r"(?i)compilation failed",
        r"(?i)undefined reference",
        r"(?i)segmentation fault",
        r"(?i)execution failed",
    ])
    .expect("c error patterns are valid");
    static ref GO_ERRORS: RegexSet = RegexSet::new([
        r"(?m)^\S*\.go:\d+:\d+:",
        r"(?m)^panic:",
        r"(?i)compilation failed",
        r"(?i)execution failed",
    ])
    .expect("go error patterns are valid");
}

/// Write `source` into a scratch directory as `file_name`
async fn write_source(dir: &Path, file_name: &str, source: &str) -> ToolResult<()> {
    tokio::fs::write(dir.join(file_name), source).await?;
    Ok(())
}

/// Compiles a C snippet with gcc in a scratch directory and runs the binary
pub struct CInterpreter {
    compiler: String,
    timeout: Duration,
}

impl Default for CInterpreter {
    fn default() -> Self {
        Self {
            compiler: "gcc".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CInterpreter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tool for CInterpreter {
    fn tag(&self) -> &str {
        "c"
    }

    fn description(&self) -> &str {
        "Compile and run a C program"
    }

    async fn execute(&self, code: &str) -> ToolResult<String> {
        let scratch = tempfile::tempdir()?;
        write_source(scratch.path(), "main.c", code).await?;

        let mut compile = Command::new(&self.compiler);
        compile
            .args(["main.c", "-o", "main", "-lm"])
            .current_dir(scratch.path());
        let compiled = process::run(compile, &self.compiler, self.timeout).await?;
        if !compiled.success() {
            return Ok(format!("compilation failed:\n{}", compiled.render()));
        }

        let run = Command::new(scratch.path().join("main"));
        Ok(process::run(run, "main", self.timeout).await?.render())
    }

    fn failed(&self, output: &str) -> bool {
        C_ERRORS.is_match(output)
    }
}

/// Runs a Go `main` package with `go run` in a scratch directory
pub struct GoInterpreter {
    timeout: Duration,
}

impl Default for GoInterpreter {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GoInterpreter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tool for GoInterpreter {
    fn tag(&self) -> &str {
        "go"
    }

    fn description(&self) -> &str {
        "Compile and run a Go program"
    }

    async fn execute(&self, code: &str) -> ToolResult<String> {
        let scratch = tempfile::tempdir()?;
        write_source(scratch.path(), "main.go", code).await?;

        let mut command = Command::new("go");
        command.args(["run", "main.go"]).current_dir(scratch.path());
        Ok(process::run(command, "go", self.timeout).await?.render())
    }

    fn failed(&self, output: &str) -> bool {
        GO_ERRORS.is_match(output)
    }
}
