use include_dir::{include_dir, Dir};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Error as TeraError, Tera};

use crate::tools::ToolInfo;

static PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

/// Values every agent prompt template can refer to
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub name: String,
    pub work_dir: String,
    pub languages: Vec<String>,
    pub tools: Vec<ToolInfo>,
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render("inline_template", &context)
}

/// Render a template file. A path that exists on disk wins over the copy
/// bundled into the binary under `src/prompts`.
pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    let template_content = if template_path.exists() {
        fs::read_to_string(&template_path)
            .map_err(|e| TeraError::chain("Failed to read template file", e))?
    } else {
        bundled(&template_path)?.to_string()
    };
    load_prompt(&template_content, context_data)
}

fn bundled(path: &Path) -> Result<&'static str, TeraError> {
    PROMPTS
        .get_file(path)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| TeraError::msg(format!("No prompt template at {}", path.display())))
}

/// Bundled template path for an agent prompt, e.g. `jarvis/coder_agent.md`
pub fn agent_prompt_path(personality: &str, agent_file: &str) -> PathBuf {
    Path::new(personality).join(format!("{}.md", agent_file))
}
