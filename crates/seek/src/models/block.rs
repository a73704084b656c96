use serde::{Deserialize, Serialize};

const FENCE: &str = "```";

/// One fenced region of a model reply.
///
/// The header after the opening fence is the language tag, optionally followed
/// by `:<path>` naming a file the source should also be saved to
/// (`python:hello.py`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language_tag: String,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
}

impl CodeBlock {
    pub fn new<T: Into<String>, S: Into<String>>(language_tag: T, source_text: S) -> Self {
        CodeBlock {
            language_tag: language_tag.into(),
            source_text: source_text.into(),
            save_path: None,
        }
    }

    fn from_header(header: &str, lines: Vec<&str>) -> Self {
        let (tag, save_path) = match header.split_once(':') {
            Some((tag, path)) if !path.trim().is_empty() => (tag, Some(path.trim().to_string())),
            Some((tag, _)) => (tag, None),
            None => (header, None),
        };
        CodeBlock {
            language_tag: tag.trim().to_lowercase(),
            source_text: lines.join("\n"),
            save_path,
        }
    }
}

/// Outcome of running one block through the tool registered for its tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub tool_type: String,
    pub block: CodeBlock,
    pub output: String,
    pub feedback: String,
    pub success: bool,
}

enum Segment<'a> {
    Text(&'a str),
    Block(CodeBlock),
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let Some(header) = line.trim_start().strip_prefix(FENCE) else {
            out.push(Segment::Text(line));
            i += 1;
            continue;
        };
        let close = lines[i + 1..]
            .iter()
            .position(|l| l.trim_start().starts_with(FENCE))
            .map(|offset| i + 1 + offset);
        match close {
            Some(end) => {
                out.push(Segment::Block(CodeBlock::from_header(
                    header.trim(),
                    lines[i + 1..end].to_vec(),
                )));
                i = end + 1;
            }
            // unterminated fence: not a block
            None => {
                out.push(Segment::Text(line));
                i += 1;
            }
        }
    }
    out
}

/// Every complete fenced region of `text`, in order of appearance.
pub fn extract_blocks(text: &str) -> Vec<CodeBlock> {
    segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Block(block) => Some(block),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Replace each fenced region with a `block:<index>` line so the user-facing
/// answer carries no fence markup. Indices follow `extract_blocks` order.
pub fn remove_blocks(text: &str) -> String {
    let mut index = 0;
    let lines: Vec<String> = segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(line) => line.to_string(),
            Segment::Block(_) => {
                let placeholder = format!("block:{}", index);
                index += 1;
                placeholder
            }
        })
        .collect();
    lines.join("\n").trim_end().to_string()
}
