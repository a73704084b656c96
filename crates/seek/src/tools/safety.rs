use std::path::{Component, Path, PathBuf};

use lazy_static::lazy_static;
use regex::RegexSet;

lazy_static! {
    static ref DESTRUCTIVE: RegexSet = RegexSet::new([
        r"\brm\s+(-[a-zA-Z]+\s+)*(/|/\*|~|\$HOME)(\s|$)",
        r"\bmkfs(\.\w+)?\b",
        r"\bdd\s+.*\bof=/dev/",
        r">\s*/dev/(sd|nvme|hd)[a-z0-9]*",
        r"(^|[;&|]\s*)(sudo\s+)?(shutdown|reboot|halt|poweroff)\b",
        r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        r"\bchmod\s+(-[a-zA-Z]+\s+)*[0-7]{3,4}\s+/(\s|$)",
    ])
    .expect("destructive command patterns are valid");
}

/// Program prefixes that mean a shell block is trying to run code in another
/// language, which belongs in its own fenced block
const INTERPRETERS: &[&str] = &[
    "python", "gcc", "g++", "go", "java", "javac", "rustc", "clang", "node", "mvn",
];

/// True when `command` matches a known-destructive pattern
pub fn is_destructive(command: &str) -> bool {
    command.lines().any(|line| DESTRUCTIVE.is_match(line.trim()))
}

/// The first command line that launches another language interpreter, if any
pub fn interpreter_launch(command: &str) -> Option<&str> {
    command.lines().map(str::trim).find(|line| {
        let mut words = line.split_whitespace();
        let first = match words.next() {
            Some("sudo") => words.next(),
            other => other,
        };
        first.is_some_and(is_interpreter)
    })
}

/// `python`, `python3`, `python3.11` or `/usr/bin/node`, but not `gofmt` or `nodemon`
fn is_interpreter(word: &str) -> bool {
    let program = word.rsplit('/').next().unwrap_or(word);
    INTERPRETERS.iter().any(|lang| {
        program.strip_prefix(lang).is_some_and(|version| {
            version.chars().all(|c| c.is_ascii_digit() || c == '.')
        })
    })
}

/// `relative` joined onto `root`, or `None` when it is absolute or climbs
/// out with `..`
pub fn confined_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut normal = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    normal.then(|| root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destructive_commands() {
        assert!(is_destructive("rm -rf /"));
        assert!(is_destructive("ls\nsudo rm -rf /*"));
        assert!(is_destructive("mkfs.ext4 /dev/sda1"));
        assert!(is_destructive("dd if=/dev/zero of=/dev/sda"));
        assert!(is_destructive("sudo shutdown -h now"));
        assert!(is_destructive(":(){ :|:& };:"));
    }

    #[test]
    fn test_ordinary_commands() {
        assert!(!is_destructive("rm -rf ./build"));
        assert!(!is_destructive("echo 'reboot later'"));
        assert!(!is_destructive("ls -la /tmp"));
    }

    #[test]
    fn test_interpreter_launch() {
        assert_eq!(interpreter_launch("ls\npython3 app.py"), Some("python3 app.py"));
        assert_eq!(interpreter_launch("sudo go run ."), Some("sudo go run ."));
        assert_eq!(interpreter_launch("echo python"), None);
        assert_eq!(interpreter_launch("git status"), None);
        assert_eq!(
            interpreter_launch("/usr/bin/python3.11 -V"),
            Some("/usr/bin/python3.11 -V")
        );
    }

    #[test]
    fn test_interpreter_lookalikes_are_allowed() {
        for command in ["gofmt -l .", "goimports -w main.go", "nodemon app.js", "clang-format -i a.c"] {
            assert_eq!(interpreter_launch(command), None, "{} was refused", command);
        }
    }

    #[test]
    fn test_confined_path() {
        let root = Path::new("/work");
        assert_eq!(
            confined_path(root, "./src/main.rs"),
            Some(PathBuf::from("/work/src/main.rs"))
        );
        assert_eq!(confined_path(root, "/etc/passwd"), None);
        assert_eq!(confined_path(root, "a/../../b"), None);
        assert_eq!(confined_path(root, "."), None);
    }
}
