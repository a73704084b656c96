use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

use crate::errors::{panic_message, AgentError, AgentResult, ProviderError};
use crate::models::block::{extract_blocks, remove_blocks, CodeBlock, ExecutionResult};
use crate::models::memory::Memory;
use crate::models::message::Role;
use crate::prompt_template::{agent_prompt_path, load_prompt_file, PromptContext};
use crate::providers::base::{Generation, Provider};
use crate::tools::base::error_feedback;
use crate::tools::bash::BashInterpreter;
use crate::tools::compiled::{CInterpreter, GoInterpreter};
use crate::tools::file_finder::FileFinder;
use crate::tools::javascript::JavaScriptInterpreter;
use crate::tools::python::PyInterpreter;
use crate::tools::safety::confined_path;
use crate::tools::web_search::WebSearch;
use crate::tools::{Tool, Toolbox};

pub const MAX_ATTEMPTS: usize = 3;

pub const STATUS_IDLE: &str = "Haven't started yet";
pub const STATUS_THINKING: &str = "Thinking...";
pub const STATUS_EXECUTING: &str = "Executing code...";
pub const STATUS_READY: &str = "Ready";
pub const STATUS_STOPPED: &str = "Stopped";

/// What kind of query an agent is built to handle
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AgentRole {
    Talk,
    Coding,
    Files,
}

impl AgentRole {
    /// Base name of the prompt template for this role
    pub fn prompt_file(self) -> &'static str {
        match self {
            AgentRole::Talk => "casual_agent",
            AgentRole::Coding => "coder_agent",
            AgentRole::Files => "file_agent",
        }
    }
}

/// Cloneable view of an agent's stop flag and status. Readable while the agent
/// itself is busy inside `process`.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    name: String,
    role: AgentRole,
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<String>>,
}

impl AgentHandle {
    fn new(name: &str, role: AgentRole) -> Self {
        Self {
            name: name.to_string(),
            role,
            stop: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(STATUS_IDLE.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Ask the running loop to give up before its next attempt
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    pub fn status(&self) -> String {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_status(&self, status: &str) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status.to_string();
    }
}

/// A provider, a memory and a set of tools, driven by the execute/retry loop.
///
/// Variants differ only in their role and the tools they are given.
pub struct Agent {
    role: AgentRole,
    provider: Arc<dyn Provider>,
    memory: Memory,
    tools: Toolbox,
    work_dir: Option<PathBuf>,
    max_attempts: usize,
    last_answer: String,
    last_reasoning: String,
    last_success: bool,
    blocks_result: Vec<ExecutionResult>,
    handle: AgentHandle,
}

impl Agent {
    pub fn new(name: &str, role: AgentRole, provider: Arc<dyn Provider>) -> Self {
        Self {
            role,
            provider,
            memory: Memory::default(),
            tools: Toolbox::new(),
            work_dir: None,
            max_attempts: MAX_ATTEMPTS,
            last_answer: String::new(),
            last_reasoning: String::new(),
            last_success: false,
            blocks_result: Vec::new(),
            handle: AgentHandle::new(name, role),
        }
    }

    /// Conversational agent. Its only tool is the web search stub.
    pub fn casual(name: &str, provider: Arc<dyn Provider>) -> Self {
        Self::new(name, AgentRole::Talk, provider).with_tool(Arc::new(WebSearch))
    }

    /// Agent that writes code and runs it in `work_dir`
    pub fn coder(name: &str, provider: Arc<dyn Provider>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self::new(name, AgentRole::Coding, provider)
            .with_tool(Arc::new(BashInterpreter::new(&work_dir)))
            .with_tool(Arc::new(PyInterpreter::new(&work_dir)))
            .with_tool(Arc::new(JavaScriptInterpreter::new(&work_dir)))
            .with_tool(Arc::new(CInterpreter::new()))
            .with_tool(Arc::new(GoInterpreter::new()))
            .with_work_dir(work_dir)
    }

    /// Agent that looks up and manages files under `work_dir`
    pub fn file(name: &str, provider: Arc<dyn Provider>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self::new(name, AgentRole::Files, provider)
            .with_tool(Arc::new(FileFinder::new(&work_dir)))
            .with_tool(Arc::new(BashInterpreter::new(&work_dir)))
            .with_work_dir(work_dir)
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.memory.set_system_prompt(prompt);
        self
    }

    /// Render the prompt template for this agent's role. `personality` names a
    /// bundled prompt set (`base`, `jarvis`) or a directory holding one.
    pub fn with_prompt(self, personality: &str, languages: &[String]) -> AgentResult<Self> {
        let context = PromptContext {
            name: self.handle.name.clone(),
            work_dir: self
                .work_dir
                .as_deref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
            languages: languages.to_vec(),
            tools: self.tools.infos(),
        };
        let path = agent_prompt_path(personality, self.role.prompt_file());
        let prompt =
            load_prompt_file(&path, &context).map_err(|e| AgentError::Prompt(e.to_string()))?;
        debug!(agent = %self.handle.name, template = %path.display(), "prompt loaded");
        Ok(self.with_system_prompt(prompt))
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn tools(&self) -> &Toolbox {
        &self.tools
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    pub fn status(&self) -> String {
        self.handle.status()
    }

    pub fn last_answer(&self) -> &str {
        &self.last_answer
    }

    pub fn last_reasoning(&self) -> &str {
        &self.last_reasoning
    }

    pub fn last_success(&self) -> bool {
        self.last_success
    }

    pub fn blocks_result(&self) -> &[ExecutionResult] {
        &self.blocks_result
    }

    pub fn request_stop(&self) {
        self.handle.request_stop();
    }

    fn user_prompt(&self, query: &str) -> String {
        match (self.role, &self.work_dir) {
            (AgentRole::Files, Some(dir)) => {
                format!("{}\nYou must work in directory: {}", query, dir.display())
            }
            _ => query.to_string(),
        }
    }

    /// Answer `query`, running any code the model writes and retrying with the
    /// execution feedback until a run succeeds or the attempts are used up.
    ///
    /// After the last attempt the latest answer is returned even when its code
    /// failed; check `last_success` for the outcome. An error is returned only
    /// when no reply was produced at all.
    pub async fn process(&mut self, query: &str) -> AgentResult<Generation> {
        self.last_success = false;
        self.blocks_result.clear();
        let prompt = self.user_prompt(query);
        self.memory.push(Role::User, prompt);

        let mut last_error: Option<ProviderError> = None;
        let mut answered = false;
        let mut stopped = false;

        for attempt in 1..=self.max_attempts {
            if self.handle.is_stop_requested() {
                info!(agent = %self.name(), attempt, "stop requested, leaving the loop");
                stopped = true;
                break;
            }

            self.handle.set_status(STATUS_THINKING);
            let generation = match self.provider.generate(self.memory.messages()).await {
                Ok(generation) => generation,
                Err(e) => {
                    warn!(agent = %self.name(), attempt, error = %e, "provider call failed");
                    last_error = Some(e);
                    continue;
                }
            };

            self.memory.push(Role::Assistant, generation.answer.clone());
            let (success, results) = self.execute_modules(&generation.answer).await;
            self.last_answer = remove_blocks(&generation.answer);
            self.last_reasoning = generation.reasoning;
            self.blocks_result = results;
            answered = true;

            if success {
                self.last_success = true;
                debug!(agent = %self.name(), attempt, "attempt succeeded");
                break;
            }
            info!(agent = %self.name(), attempt, max = self.max_attempts, "execution failed");
        }

        self.handle.clear_stop();
        self.handle
            .set_status(if stopped { STATUS_STOPPED } else { STATUS_READY });

        if answered {
            return Ok(Generation::new(
                self.last_answer.clone(),
                self.last_reasoning.clone(),
            ));
        }
        match last_error {
            Some(e) => Err(AgentError::Provider(e)),
            None => Err(AgentError::Cancelled),
        }
    }

    /// Run every block of `reply` whose tag has a registered tool, in order,
    /// stopping at the first failure. Feedback from the blocks that ran is
    /// pushed to memory as one user message.
    ///
    /// Returns whether the reply counts as a success (no block ran, or at least
    /// one block succeeded) along with the per-block results.
    pub async fn execute_modules(&mut self, reply: &str) -> (bool, Vec<ExecutionResult>) {
        let mut results: Vec<ExecutionResult> = Vec::new();

        for block in extract_blocks(reply) {
            let Some(tool) = self.tools.get(&block.language_tag).cloned() else {
                debug!(tag = %block.language_tag, "no tool for block, skipping");
                continue;
            };

            self.handle.set_status(STATUS_EXECUTING);
            let mut result = run_block(tool.as_ref(), block).await;
            if result.success {
                if let Err(reason) = self.save_block(&result.block).await {
                    warn!(tool = %result.tool_type, reason = %reason, "block not saved");
                    result.feedback.push_str(&format!("\nBlock not saved: {}", reason));
                }
            } else {
                warn!(tool = %result.tool_type, "block failed");
            }

            let failed = !result.success;
            results.push(result);
            if failed {
                break;
            }
        }

        if !results.is_empty() {
            let feedback: Vec<&str> = results.iter().map(|r| r.feedback.as_str()).collect();
            self.memory.push(Role::User, feedback.join("\n"));
        }

        let success = results.is_empty() || results.iter().any(|r| r.success);
        (success, results)
    }

    /// Write the block source to its header path under the work dir. Paths
    /// that would land outside the work dir are refused.
    async fn save_block(&self, block: &CodeBlock) -> Result<(), String> {
        let Some(save_path) = block.save_path.as_deref() else {
            return Ok(());
        };
        let Some(dir) = &self.work_dir else {
            return Err(format!("no work directory to save {} into", save_path));
        };
        let path = confined_path(dir, save_path)
            .ok_or_else(|| format!("{} is outside the work directory", save_path))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("could not create {}: {}", parent.display(), e))?;
        }
        tokio::fs::write(&path, &block.source_text)
            .await
            .map_err(|e| format!("could not write {}: {}", path.display(), e))?;
        debug!(path = %path.display(), "block saved");
        Ok(())
    }
}

/// Execute one block. Tool errors and panics become a failed result.
async fn run_block(tool: &dyn Tool, block: CodeBlock) -> ExecutionResult {
    let outcome = AssertUnwindSafe(tool.execute(&block.source_text))
        .catch_unwind()
        .await;

    let (output, feedback, success) = match outcome {
        Ok(Ok(output)) => {
            let success = !tool.failed(&output);
            (output.clone(), tool.feedback(&output), success)
        }
        Ok(Err(e)) => {
            let message = e.to_string();
            (message.clone(), error_feedback(&message), false)
        }
        Err(payload) => {
            let message = format!("tool panicked: {}", panic_message(payload.as_ref()));
            (message.clone(), error_feedback(&message), false)
        }
    };

    ExecutionResult {
        tool_type: tool.tag().to_string(),
        block,
        output,
        feedback,
        success,
    }
}
