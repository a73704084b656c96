use thiserror::Error;

/// Problems found while loading settings at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid value for {env_var}: {reason}")]
    Invalid { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets the dotted settings key `field`
pub fn to_env_var(field: &str) -> String {
    format!("SEEK_{}", field.replace('.', "__").to_uppercase())
}
