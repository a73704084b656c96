use std::sync::Arc;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::{base::Provider, configs::ProviderConfig, llm::LlmProvider};
use crate::errors::ProviderResult;
use crate::key_manager::{Environment, RealEnvironment};

/// Every backend a provider can target
#[derive(EnumIter, EnumString, Display, AsRefStr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(ascii_case_insensitive)]
pub enum ProviderType {
    #[strum(serialize = "ollama")]
    Ollama,
    #[strum(serialize = "lm-studio")]
    LmStudio,
    #[strum(serialize = "openai")]
    OpenAi,
    #[strum(serialize = "deepseek")]
    DeepSeek,
    #[strum(serialize = "together")]
    Together,
    #[strum(serialize = "google")]
    Google,
    #[strum(serialize = "huggingface")]
    HuggingFace,
    #[strum(serialize = "openrouter")]
    OpenRouter,
    #[strum(serialize = "test")]
    Test,
}

/// Request shape a backend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    OpenAiCompatible,
    Ollama,
    Google,
    Canned,
}

impl ProviderType {
    /// Cloud-hosted backends: conversation data leaves the machine, so a key is mandatory
    pub fn is_unsafe(self) -> bool {
        matches!(
            self,
            ProviderType::OpenAi
                | ProviderType::DeepSeek
                | ProviderType::Together
                | ProviderType::Google
                | ProviderType::OpenRouter
        )
    }

    pub fn wire(self) -> Wire {
        match self {
            ProviderType::Ollama => Wire::Ollama,
            ProviderType::Google => Wire::Google,
            ProviderType::Test => Wire::Canned,
            ProviderType::LmStudio
            | ProviderType::OpenAi
            | ProviderType::DeepSeek
            | ProviderType::Together
            | ProviderType::HuggingFace
            | ProviderType::OpenRouter => Wire::OpenAiCompatible,
        }
    }

    /// Host used when no server address is configured
    pub fn default_host(self) -> Option<&'static str> {
        match self {
            ProviderType::Ollama => Some(super::ollama::OLLAMA_HOST),
            ProviderType::LmStudio => Some("http://localhost:1234"),
            ProviderType::HuggingFace => Some("http://localhost:8080"),
            ProviderType::OpenAi => Some(super::openai::OPENAI_HOST),
            ProviderType::DeepSeek => Some("https://api.deepseek.com"),
            ProviderType::Together => Some("https://api.together.xyz"),
            ProviderType::OpenRouter => Some("https://openrouter.ai/api"),
            ProviderType::Google => Some(super::google::GOOGLE_HOST),
            ProviderType::Test => None,
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
    get_provider_with_env(config, &RealEnvironment::load())
}

pub fn get_provider_with_env(
    config: ProviderConfig,
    env: &impl Environment,
) -> ProviderResult<Arc<dyn Provider>> {
    Ok(Arc::new(LlmProvider::with_environment(config, env)?))
}
