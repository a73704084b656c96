use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::base::{Generation, Provider};
use super::configs::ProviderConfig;
use super::factory::{ProviderType, Wire};
use super::{canned, google, ollama, openai};
use crate::errors::{ProviderError, ProviderResult};
use crate::key_manager::{get_api_key, Environment, KeyManagerError, RealEnvironment};
use crate::models::message::Message;

/// Everything a backend function needs for one call
pub struct BackendRequest<'a> {
    pub client: &'a Client,
    pub backend: ProviderType,
    pub base_url: String,
    pub model: &'a str,
    pub api_key: Option<&'a str>,
}

/// The provider used outside of tests: one configured backend behind the
/// uniform `generate` contract.
///
/// Credential and endpoint state is resolved once at construction and is read-only afterwards.
#[derive(Debug)]
pub struct LlmProvider {
    provider_type: ProviderType,
    model: String,
    base_url: String,
    is_local: bool,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl LlmProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        Self::with_environment(config, &RealEnvironment::load())
    }

    pub fn with_environment(config: ProviderConfig, env: &impl Environment) -> ProviderResult<Self> {
        let provider_type = ProviderType::from_str(config.provider_name.trim()).map_err(|_| {
            ProviderError::Configuration(format!("Unknown provider: {}", config.provider_name))
        })?;

        if provider_type == ProviderType::OpenRouter && config.is_local {
            return Err(ProviderError::Configuration(
                "openrouter is not available for local use".to_string(),
            ));
        }

        let api_key = if provider_type.is_unsafe() && !config.is_local {
            warn!(
                provider = %provider_type,
                "using an API provider, your data will be sent to the cloud"
            );
            Some(get_api_key(provider_type.as_ref(), env).map_err(|e| match e {
                KeyManagerError::NotPresent(env_var) | KeyManagerError::Invalid { name: env_var, .. } => {
                    ProviderError::MissingCredential { env_var }
                }
            })?)
        } else {
            None
        };

        let base_url = resolve_base_url(provider_type, &config)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        info!(
            provider = %provider_type,
            model = %config.model,
            address = %base_url,
            is_local = config.is_local,
            "provider initialized"
        );

        Ok(Self {
            provider_type,
            model: config.model,
            base_url,
            is_local: config.is_local,
            api_key,
            timeout: config.timeout,
            client,
        })
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Explicit server address wins; otherwise the backend's default host. Unsafe
/// backends marked local must say where their local endpoint is.
fn resolve_base_url(provider_type: ProviderType, config: &ProviderConfig) -> ProviderResult<String> {
    if let Some(address) = config.server_address.as_deref().filter(|a| !a.trim().is_empty()) {
        return normalize_address(address);
    }
    if provider_type.is_unsafe() && config.is_local {
        return Err(ProviderError::Configuration(format!(
            "{} marked as local needs a server address",
            provider_type
        )));
    }
    Ok(provider_type.default_host().unwrap_or_default().to_string())
}

/// Accept `host:port` as well as full URLs
fn normalize_address(address: &str) -> ProviderResult<String> {
    let address = address.trim();
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    let url = Url::parse(&candidate).map_err(|e| {
        ProviderError::Configuration(format!("Invalid server address {}: {}", address, e))
    })?;
    if url.host_str().is_none() {
        return Err(ProviderError::Configuration(format!(
            "Invalid server address {}: no host",
            address
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[async_trait]
impl Provider for LlmProvider {
    fn name(&self) -> &str {
        self.provider_type.as_ref()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, history: &[Message]) -> ProviderResult<Generation> {
        let request = BackendRequest {
            client: &self.client,
            backend: self.provider_type,
            base_url: self.base_url.clone(),
            model: &self.model,
            api_key: self.api_key.as_deref(),
        };

        let call = async {
            match self.provider_type.wire() {
                Wire::OpenAiCompatible => openai::chat(&request, history).await,
                Wire::Ollama => ollama::chat(&request, history).await,
                Wire::Google => google::generate_content(&request, history).await,
                Wire::Canned => Ok(canned::reply(history)),
            }
        };

        debug!(provider = %self.provider_type, messages = history.len(), "calling backend");
        let reply = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ProviderError::call(
                    self.provider_type,
                    format!("no response within {} seconds", self.timeout.as_secs_f32()),
                )
            })??;

        Ok(reply.into_generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_manager::MockEnvironment;
    use mockall::predicate::eq;
    use std::env::VarError;

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let env = MockEnvironment::new();
        let err = LlmProvider::with_environment(ProviderConfig::new("skynet", "m"), &env).unwrap_err();
        assert_eq!(
            err,
            ProviderError::Configuration("Unknown provider: skynet".to_string())
        );
    }

    #[test]
    fn test_unsafe_remote_without_key_fails() {
        let mut env = MockEnvironment::new();
        env.expect_get_var()
            .with(eq("OPENAI_API_KEY"))
            .times(1)
            .return_once(|_| Err(VarError::NotPresent));

        let err = LlmProvider::with_environment(ProviderConfig::new("openai", "gpt-4o"), &env)
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::MissingCredential {
                env_var: "OPENAI_API_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_unsafe_remote_with_key() -> anyhow::Result<()> {
        let mut env = MockEnvironment::new();
        env.expect_get_var()
            .with(eq("DEEPSEEK_API_KEY"))
            .times(1)
            .return_once(|_| Ok("sk-live".to_string()));

        let provider =
            LlmProvider::with_environment(ProviderConfig::new("deepseek", "deepseek-chat"), &env)?;
        assert!(provider.has_api_key());
        assert_eq!(provider.base_url(), "https://api.deepseek.com");
        Ok(())
    }

    #[test]
    fn test_local_never_looks_up_credentials() -> anyhow::Result<()> {
        let mut env = MockEnvironment::new();
        env.expect_get_var().times(0);

        let config = ProviderConfig::new("openai", "llama")
            .local(true)
            .with_server_address("127.0.0.1:8000");
        let provider = LlmProvider::with_environment(config, &env)?;
        assert!(!provider.has_api_key());
        assert_eq!(provider.base_url(), "http://127.0.0.1:8000");
        Ok(())
    }

    #[test]
    fn test_local_backends_skip_credentials() -> anyhow::Result<()> {
        let mut env = MockEnvironment::new();
        env.expect_get_var().times(0);

        for name in ["ollama", "lm-studio", "huggingface", "test"] {
            let provider = LlmProvider::with_environment(ProviderConfig::new(name, "m"), &env)?;
            assert!(!provider.has_api_key(), "{} got a key", name);
        }
        Ok(())
    }

    #[test]
    fn test_openrouter_cannot_be_local() {
        let env = MockEnvironment::new();
        let config = ProviderConfig::new("openrouter", "m").local(true);
        assert!(matches!(
            LlmProvider::with_environment(config, &env),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[test]
    fn test_local_unsafe_needs_address() {
        let env = MockEnvironment::new();
        let config = ProviderConfig::new("google", "gemini").local(true);
        assert!(matches!(
            LlmProvider::with_environment(config, &env),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("localhost:11434").unwrap(), "http://localhost:11434");
        assert_eq!(
            normalize_address("https://example.com/api/").unwrap(),
            "https://example.com/api"
        );
        assert!(normalize_address("http://").is_err());
    }
}
