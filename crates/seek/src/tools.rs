use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

pub mod base;
pub mod bash;
pub mod compiled;
pub mod file_finder;
pub mod javascript;
pub mod process;
pub mod python;
pub mod safety;
pub mod web_search;

pub use base::Tool;

/// Tag and description of a registered tool, as handed to prompt templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub tag: String,
    pub description: String,
}

/// Tools an agent can dispatch to, keyed by the language tag they handle
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its tag, returning any tool it replaced
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.tag().to_lowercase(), tool)
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|tool| ToolInfo {
                tag: tool.tag().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}
