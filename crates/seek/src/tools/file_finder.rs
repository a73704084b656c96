use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::base::Tool;
use super::safety::confined_path;
use crate::errors::{ToolError, ToolResult};

const NOT_FOUND: &str = "Error: could not find";
const MAX_DEPTH: usize = 6;
const MAX_CONTENT_BYTES: usize = 8000;

/// Looks up files by name under the work directory and reports what it finds.
/// Each non-empty line of the block names one file.
pub struct FileFinder {
    work_dir: PathBuf,
}

impl FileFinder {
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Search `root` for `name`, a bare file name or a path relative to `root`.
/// Absolute names and names climbing out with `..` are never found.
fn find(root: &Path, name: &str, depth: usize) -> Option<PathBuf> {
    let direct = confined_path(root, name)?;
    if direct.exists() {
        return Some(direct);
    }
    if depth == 0 {
        return None;
    }
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(root).ok()?.flatten() {
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_dir() && !hidden {
            subdirs.push(path);
        } else if entry.file_name() == name {
            return Some(path);
        }
    }
    subdirs.sort();
    subdirs.iter().find_map(|dir| find(dir, name, depth - 1))
}

fn describe(path: &Path) -> String {
    if path.is_dir() {
        let mut entries: Vec<String> = fs::read_dir(path)
            .map(|dir| {
                dir.flatten()
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        return format!("Directory: {}\nEntries: {}", path.display(), entries.join(", "));
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return format!("File: {}\nUnreadable: {}", path.display(), e),
    };
    let content = if bytes.contains(&0) {
        "(binary file)".to_string()
    } else if bytes.len() > MAX_CONTENT_BYTES {
        format!(
            "{}\n... ({} more bytes)",
            String::from_utf8_lossy(&bytes[..MAX_CONTENT_BYTES]),
            bytes.len() - MAX_CONTENT_BYTES
        )
    } else {
        String::from_utf8_lossy(&bytes).to_string()
    };
    format!(
        "File: {}\nSize: {} bytes\nContent:\n{}",
        path.display(),
        bytes.len(),
        content
    )
}

#[async_trait]
impl Tool for FileFinder {
    fn tag(&self) -> &str {
        "file_finder"
    }

    fn description(&self) -> &str {
        "Find files by name in the working directory and show their content"
    }

    async fn execute(&self, code: &str) -> ToolResult<String> {
        let names: Vec<String> = code
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(ToolError::InvalidInput("no file name given".to_string()));
        }

        let root = self.work_dir.clone();
        let reports = tokio::task::spawn_blocking(move || {
            names
                .iter()
                .map(|name| match find(&root, name, MAX_DEPTH) {
                    Some(path) => describe(&path),
                    None => format!("{} '{}' under {}", NOT_FOUND, name, root.display()),
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ToolError::Io(std::io::Error::other(e.to_string())))?;

        Ok(reports.join("\n\n"))
    }

    fn failed(&self, output: &str) -> bool {
        output.lines().any(|line| line.starts_with(NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finds_nested_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("a/b"))?;
        fs::write(dir.path().join("a/b/notes.txt"), "remember the milk")?;

        let finder = FileFinder::new(dir.path());
        let output = finder.execute("notes.txt").await?;
        assert!(output.contains("notes.txt"));
        assert!(output.contains("Size: 17 bytes"));
        assert!(output.contains("remember the milk"));
        assert!(!finder.failed(&output));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_fails() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let finder = FileFinder::new(dir.path());
        let output = finder.execute("ghost.txt").await?;
        assert!(output.starts_with("Error: could not find 'ghost.txt'"));
        assert!(finder.failed(&output));
        Ok(())
    }

    #[tokio::test]
    async fn test_lists_directories_and_skips_hidden() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join(".git/objects"))?;
        fs::write(dir.path().join(".git/objects/secret"), "x")?;
        fs::create_dir_all(dir.path().join("src"))?;
        fs::write(dir.path().join("src/main.rs"), "fn main() {}")?;

        let finder = FileFinder::new(dir.path());
        let output = finder.execute("src\nsecret").await?;
        assert!(output.contains("Entries: main.rs"));
        assert!(output.contains("Error: could not find 'secret'"));
        Ok(())
    }

    #[tokio::test]
    async fn test_names_outside_work_dir_are_not_found() -> anyhow::Result<()> {
        let outside = tempfile::tempdir()?;
        fs::write(outside.path().join("secret.txt"), "TOP SECRET")?;
        let parent = tempfile::tempdir()?;
        let work = parent.path().join("work");
        fs::create_dir_all(&work)?;
        fs::write(parent.path().join("secret.txt"), "TOP SECRET")?;

        let finder = FileFinder::new(&work);
        let absolute = outside.path().join("secret.txt").display().to_string();
        for name in [absolute.as_str(), "../secret.txt"] {
            let output = finder.execute(name).await?;
            assert!(output.starts_with("Error: could not find"), "{} leaked: {}", name, output);
            assert!(!output.contains("TOP SECRET"));
            assert!(finder.failed(&output));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_block_is_invalid() {
        let finder = FileFinder::new(".");
        assert!(matches!(
            finder.execute("\n  \n").await,
            Err(ToolError::InvalidInput(_))
        ));
    }
}
