use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentHandle, AgentRole, STATUS_READY, STATUS_STOPPED};
use crate::errors::{panic_message, InteractionError, InteractionResult};
use crate::models::block::ExecutionResult;
use crate::router::Classifier;

pub const NO_ANSWER: &str = "Error: No answer from agent";
pub const NO_REASONING: &str = "Error: No reasoning from agent";
const UNKNOWN_AGENT: &str = "Unknown";

/// Lifecycle of the single query slot. `Idle -> Generating` only happens
/// through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationState {
    Idle,
    Generating,
    Done,
    Failed,
}

/// Outcome of one query, as handed to the boundary layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub done: bool,
    pub answer: String,
    pub reasoning: String,
    pub agent_name: String,
    pub success: bool,
    pub blocks: Vec<ExecutionResult>,
    pub status: String,
    pub uid: String,
}

impl QueryRecord {
    /// Placeholder for a query that has not finished
    pub fn pending(uid: impl Into<String>, agent_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            done: false,
            answer: String::new(),
            reasoning: String::new(),
            agent_name: agent_name.into(),
            success: false,
            blocks: Vec::new(),
            status: status.into(),
            uid: uid.into(),
        }
    }

    /// Reply for a query turned away because another one holds the gate
    pub fn busy() -> Self {
        Self::pending(Uuid::new_v4().to_string(), UNKNOWN_AGENT, STATUS_READY)
    }
}

#[derive(Debug)]
struct Session {
    generating: bool,
    state: GenerationState,
    current_agent: Option<usize>,
    pending_uid: Option<String>,
    stop_requested: bool,
    last_answer: String,
    last_reasoning: String,
    last_success: bool,
    history: Vec<QueryRecord>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            generating: false,
            state: GenerationState::Idle,
            current_agent: None,
            pending_uid: None,
            stop_requested: false,
            last_answer: String::new(),
            last_reasoning: String::new(),
            last_success: false,
            history: Vec::new(),
        }
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the single-flight gate. Dropping it without `finish` (a cancelled or
/// dropped run) still opens the gate and marks the run failed.
struct GenerationGuard {
    session: Arc<Mutex<Session>>,
}

impl GenerationGuard {
    fn acquire(session: &Arc<Mutex<Session>>, uid: &str) -> InteractionResult<Self> {
        let mut s = lock(session);
        if s.generating {
            warn!(uid, "query rejected, another one is in flight");
            return Err(InteractionError::Busy);
        }
        s.generating = true;
        s.state = GenerationState::Generating;
        s.pending_uid = Some(uid.to_string());
        s.current_agent = None;
        s.stop_requested = false;
        debug!(uid, "gate acquired");
        Ok(Self {
            session: Arc::clone(session),
        })
    }

    /// Record the chosen agent and hand it any stop that arrived before it
    /// was picked
    fn select(&self, index: usize, handle: &AgentHandle) {
        let mut s = lock(&self.session);
        s.current_agent = Some(index);
        if s.stop_requested {
            handle.request_stop();
        } else {
            handle.clear_stop();
        }
    }

    /// Close the run. The state follows the recorded outcome; a stop that
    /// arrived after the loop had already finished does not change it.
    fn finish(&self, record: &QueryRecord) {
        let mut s = lock(&self.session);
        s.state = if record.success && record.status != STATUS_STOPPED {
            GenerationState::Done
        } else {
            GenerationState::Failed
        };
        s.stop_requested = false;
        s.last_answer = record.answer.clone();
        s.last_reasoning = record.reasoning.clone();
        s.last_success = record.success;
        s.history.push(record.clone());
        s.generating = false;
        s.pending_uid = None;
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut s = lock(&self.session);
        if s.generating {
            warn!("query ended without a result, releasing the gate");
            s.generating = false;
            s.state = GenerationState::Failed;
            s.pending_uid = None;
        }
    }
}

struct AgentSlot {
    handle: AgentHandle,
    agent: tokio::sync::Mutex<Agent>,
}

/// A query started with `Interaction::submit`
#[derive(Debug)]
pub struct QueryHandle {
    uid: String,
    task: JoinHandle<QueryRecord>,
}

impl QueryHandle {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Wait for the query to finish
    pub async fn wait(self) -> InteractionResult<QueryRecord> {
        self.task
            .await
            .map_err(|e| InteractionError::Internal(e.to_string()))
    }
}

/// Session controller: owns the agents, routes each query to one of them and
/// lets only one query run at a time.
pub struct Interaction {
    agents: Vec<AgentSlot>,
    classifier: Box<dyn Classifier>,
    fallback: usize,
    active: AtomicBool,
    session: Arc<Mutex<Session>>,
}

impl Interaction {
    /// The first agent is the fallback for queries the classifier can't place.
    pub fn new(agents: Vec<Agent>, classifier: Box<dyn Classifier>) -> InteractionResult<Self> {
        if agents.is_empty() {
            return Err(InteractionError::NoAgents);
        }
        let agents = agents
            .into_iter()
            .map(|agent| AgentSlot {
                handle: agent.handle(),
                agent: tokio::sync::Mutex::new(agent),
            })
            .collect();
        Ok(Self {
            agents,
            classifier,
            fallback: 0,
            active: AtomicBool::new(true),
            session: Arc::new(Mutex::new(Session::default())),
        })
    }

    pub fn with_fallback(mut self, index: usize) -> InteractionResult<Self> {
        if index >= self.agents.len() {
            return Err(InteractionError::InvalidFallback(index));
        }
        self.fallback = index;
        Ok(self)
    }

    /// Run `query` to completion and report whether it succeeded.
    pub async fn think(&self, query: &str) -> InteractionResult<bool> {
        Ok(self.ask(query).await?.success)
    }

    /// Run `query` to completion and return its record.
    pub async fn ask(&self, query: &str) -> InteractionResult<QueryRecord> {
        let uid = self.open()?;
        let guard = GenerationGuard::acquire(&self.session, &uid)?;
        Ok(self.run(query, uid, guard).await)
    }

    /// Take the gate now and run `query` in the background.
    pub fn submit(self: &Arc<Self>, query: impl Into<String>) -> InteractionResult<QueryHandle> {
        let uid = self.open()?;
        let guard = GenerationGuard::acquire(&self.session, &uid)?;
        let query = query.into();
        let this = Arc::clone(self);
        let task_uid = uid.clone();
        let task = tokio::spawn(async move { this.run(&query, task_uid, guard).await });
        Ok(QueryHandle { uid, task })
    }

    fn open(&self) -> InteractionResult<String> {
        if !self.is_active() {
            return Err(InteractionError::Internal(
                "the interaction has been shut down".to_string(),
            ));
        }
        Ok(Uuid::new_v4().to_string())
    }

    async fn select(&self, query: &str) -> usize {
        let roles: Vec<AgentRole> = self.agents.iter().map(|slot| slot.handle.role()).collect();
        let chosen = self.classifier.classify(query, &roles).await;
        chosen
            .and_then(|role| roles.iter().position(|r| *r == role))
            .unwrap_or(self.fallback)
    }

    async fn run(&self, query: &str, uid: String, guard: GenerationGuard) -> QueryRecord {
        let outcome = AssertUnwindSafe(async {
            let index = self.select(query).await;
            let slot = &self.agents[index];
            guard.select(index, &slot.handle);
            info!(uid = %uid, agent = %slot.handle.name(), role = %slot.handle.role(), "agent selected");

            let mut agent = slot.agent.lock().await;
            let result = agent.process(query).await;
            (index, result, agent.last_success(), agent.blocks_result().to_vec())
        })
        .catch_unwind()
        .await;

        let record = match outcome {
            Ok((index, Ok(generation), success, blocks)) => QueryRecord {
                done: true,
                answer: generation.answer,
                reasoning: generation.reasoning,
                agent_name: self.agents[index].handle.name().to_string(),
                success,
                blocks,
                status: self.agents[index].handle.status(),
                uid,
            },
            Ok((index, Err(e), _, blocks)) => {
                warn!(uid = %uid, error = %e, "agent produced no answer");
                QueryRecord {
                    done: true,
                    answer: NO_ANSWER.to_string(),
                    reasoning: NO_REASONING.to_string(),
                    agent_name: self.agents[index].handle.name().to_string(),
                    success: false,
                    blocks,
                    status: self.agents[index].handle.status(),
                    uid,
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(uid = %uid, error = %message, "agent loop panicked");
                if let Some(handle) = self.current_handle() {
                    handle.clear_stop();
                    handle.set_status(STATUS_READY);
                }
                QueryRecord {
                    done: true,
                    answer: NO_ANSWER.to_string(),
                    reasoning: format!("Error: {}", message),
                    agent_name: self
                        .current_agent_name()
                        .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
                    success: false,
                    blocks: Vec::new(),
                    status: STATUS_READY.to_string(),
                    uid,
                }
            }
        };

        guard.finish(&record);
        info!(uid = %record.uid, success = record.success, "query finished");
        record
    }

    /// Latest record for the boundary to return. While a query runs this is a
    /// `done = false` placeholder; afterwards it is the last history entry,
    /// returned as is on every call.
    pub fn poll_latest_answer(&self) -> InteractionResult<QueryRecord> {
        let s = lock(&self.session);
        if s.generating {
            let slot = s.current_agent.map(|i| &self.agents[i].handle);
            return Ok(QueryRecord::pending(
                s.pending_uid.clone().unwrap_or_default(),
                slot.map_or(UNKNOWN_AGENT, |h| h.name()),
                slot.map(AgentHandle::status)
                    .unwrap_or_else(|| STATUS_READY.to_string()),
            ));
        }
        s.history.last().cloned().ok_or(InteractionError::NoAnswer)
    }

    /// Ask the running agent to stop before its next attempt. No effect when idle.
    pub fn request_stop(&self) {
        let mut s = lock(&self.session);
        if !s.generating {
            debug!("stop requested while idle");
            return;
        }
        s.stop_requested = true;
        if let Some(index) = s.current_agent {
            info!(agent = %self.agents[index].handle.name(), "stop requested");
            self.agents[index].handle.request_stop();
        }
    }

    /// False once the interaction has been shut down
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_generating(&self) -> bool {
        lock(&self.session).generating
    }

    pub fn state(&self) -> GenerationState {
        lock(&self.session).state
    }

    pub fn history(&self) -> Vec<QueryRecord> {
        lock(&self.session).history.clone()
    }

    pub fn last_answer(&self) -> String {
        lock(&self.session).last_answer.clone()
    }

    pub fn last_reasoning(&self) -> String {
        lock(&self.session).last_reasoning.clone()
    }

    pub fn last_success(&self) -> bool {
        lock(&self.session).last_success
    }

    pub fn current_agent_name(&self) -> Option<String> {
        self.current_handle().map(|h| h.name().to_string())
    }

    fn current_handle(&self) -> Option<&AgentHandle> {
        let index = lock(&self.session).current_agent?;
        Some(&self.agents[index].handle)
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents
            .iter()
            .map(|slot| slot.handle.name().to_string())
            .collect()
    }

    /// Refuse new queries and stop every agent
    pub fn shutdown(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("interaction shutting down");
        }
        for slot in &self.agents {
            slot.handle.request_stop();
        }
    }
}
