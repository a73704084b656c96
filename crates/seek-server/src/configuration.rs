use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use seek::providers::configs::ProviderConfig;
use seek::providers::ollama;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const PERSONALITIES: &[&str] = &["base", "jarvis"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                env_var: to_env_var("server.host"),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub server_address: Option<String>,
    pub is_local: bool,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    // Convert to the seek ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        let config = ProviderConfig::new(self.name, self.model)
            .local(self.is_local)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match self.server_address {
            Some(address) if !address.trim().is_empty() => config.with_server_address(address),
            _ => config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterKind {
    Keyword,
    Llm,
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    pub name: String,
    pub personality: String,
    languages: String,
    work_dir: String,
    pub max_attempts: usize,
    pub router: RouterKind,
}

impl AgentSettings {
    /// Languages from the comma separated setting
    pub fn languages(&self) -> Vec<String> {
        self.languages
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Work directory with `~` and environment variables expanded
    pub fn work_dir(&self) -> Result<PathBuf, ConfigError> {
        shellexpand::full(&self.work_dir)
            .map(|expanded| PathBuf::from(expanded.as_ref()))
            .map_err(|e| ConfigError::Invalid {
                env_var: to_env_var("agent.work_dir"),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 7777)?
            .set_default("server.log_format", "text")?
            // Provider defaults
            .set_default("provider.name", "ollama")?
            .set_default("provider.model", ollama::OLLAMA_MODEL)?
            .set_default("provider.is_local", true)?
            .set_default("provider.timeout_secs", 600)?
            // Agent defaults
            .set_default("agent.name", "Seek")?
            .set_default("agent.personality", "base")?
            .set_default("agent.languages", "en")?
            .set_default("agent.work_dir", default_work_dir())?
            .set_default("agent.max_attempts", seek::agent::MAX_ATTEMPTS as u64)?
            .set_default("agent.router", "keyword")?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("SEEK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = match config.try_deserialize() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                } else if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                return Err(ConfigError::Other(err));
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let personality = &self.agent.personality;
        if !PERSONALITIES.contains(&personality.as_str()) && !Path::new(personality).is_dir() {
            return Err(ConfigError::Invalid {
                env_var: to_env_var("agent.personality"),
                reason: format!(
                    "expected one of {} or a prompt directory, got {}",
                    PERSONALITIES.join(", "),
                    personality
                ),
            });
        }
        if self.agent.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                env_var: to_env_var("agent.max_attempts"),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.agent.languages().is_empty() {
            return Err(ConfigError::Invalid {
                env_var: to_env_var("agent.languages"),
                reason: "at least one language is required".to_string(),
            });
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                env_var: to_env_var("provider.timeout_secs"),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_work_dir() -> String {
    dirs::home_dir()
        .map(|home| home.join("seek_workspace"))
        .unwrap_or_else(|| PathBuf::from("seek_workspace"))
        .display()
        .to_string()
}
