use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::agent::AgentRole;
use crate::models::message::Message;
use crate::providers::base::Provider;

/// Decides which role should handle a query.
///
/// `roles` lists the roles that have an agent. `None` means no opinion and the
/// caller falls back to its default agent.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, query: &str, roles: &[AgentRole]) -> Option<AgentRole>;
}

lazy_static! {
    static ref ARITHMETIC: Regex =
        Regex::new(r"\d+\s*[-+*/%^]\s*\d+").expect("arithmetic pattern is valid");
}

const CODING_WORDS: &[&str] = &[
    "code", "script", "program", "function", "compile", "debug", "bug", "run", "execute",
    "calculate", "compute", "algorithm", "python", "bash", "shell", "javascript", "node", "golang",
    "go", "c", "implement", "output",
];

const FILE_WORDS: &[&str] = &[
    "file", "files", "folder", "folders", "directory", "directories", "find", "locate", "rename",
    "move", "copy", "delete", "path", "read", "open", "organize",
];

const TALK_WORDS: &[&str] = &[
    "hello", "hi", "hey", "thanks", "thank", "how", "who", "why", "tell", "joke", "chat", "news",
    "weather", "search", "opinion", "feel",
];

/// Picks the role whose keyword list best matches the query's words
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn score(role: AgentRole, words: &HashSet<String>, query: &str) -> usize {
        let keywords = match role {
            AgentRole::Coding => CODING_WORDS,
            AgentRole::Files => FILE_WORDS,
            AgentRole::Talk => TALK_WORDS,
        };
        let mut score = keywords.iter().filter(|k| words.contains(**k)).count();
        if role == AgentRole::Coding && ARITHMETIC.is_match(query) {
            score += 2;
        }
        score
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, query: &str, roles: &[AgentRole]) -> Option<AgentRole> {
        let lowered = query.to_lowercase();
        let words: HashSet<String> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        let mut best: Option<(AgentRole, usize)> = None;
        for &role in roles {
            let score = Self::score(role, &words, &lowered);
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((role, score));
            }
        }
        debug!(?best, "keyword classification");
        best.map(|(role, _)| role)
    }
}

/// Asks a provider to label the query with one role name
pub struct LlmClassifier {
    provider: Arc<dyn Provider>,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    fn instructions(roles: &[AgentRole]) -> String {
        let labels: Vec<&str> = roles.iter().map(|r| r.as_ref()).collect();
        format!(
            "Classify the user request into exactly one of these labels: {}.\n\
             talk is conversation and questions, coding is writing or running code \
             and calculations, files is finding or managing files.\n\
             Reply with the label only.",
            labels.join(", ")
        )
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, query: &str, roles: &[AgentRole]) -> Option<AgentRole> {
        let history = [
            Message::system().with_text(Self::instructions(roles)),
            Message::user().with_text(query),
        ];
        let generation = match self.provider.generate(&history).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(error = %e, "classifier call failed, using the fallback agent");
                return None;
            }
        };

        let label = generation.answer.trim().to_lowercase();
        let role = roles
            .iter()
            .copied()
            .filter(|role| label.contains(role.as_ref()))
            .min_by_key(|role| label.find(role.as_ref()));
        debug!(label = %label, ?role, "llm classification");
        role
    }
}
