use std::env;
use thiserror::Error;
#[cfg(test)]
use mockall::automock;
#[cfg(test)]
use mockall::predicate::*;

#[derive(Error, Debug)]
pub enum KeyManagerError {
    #[error("Environment variable {0} is not set")]
    NotPresent(String),

    #[error("Environment variable {name} is not valid: {reason}")]
    Invalid { name: String, reason: String },
}

#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> std::result::Result<String, env::VarError>;
}

/// Reads the process environment, after loading a `.env` file from the working
/// directory if one exists.
pub struct RealEnvironment;

impl RealEnvironment {
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        RealEnvironment
    }
}

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> std::result::Result<String, env::VarError> {
        env::var(key)
    }
}

/// Name of the variable holding the key for `provider`, e.g. `OPENAI_API_KEY`.
pub fn api_key_var(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"))
}

pub fn get_api_key(provider: &str, env: &impl Environment) -> Result<String, KeyManagerError> {
    let name = api_key_var(provider);
    match env.get_var(&name) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) | Err(env::VarError::NotPresent) => Err(KeyManagerError::NotPresent(name)),
        Err(e) => Err(KeyManagerError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_var_naming() {
        assert_eq!(api_key_var("openai"), "OPENAI_API_KEY");
        assert_eq!(api_key_var("openrouter"), "OPENROUTER_API_KEY");
        assert_eq!(api_key_var("lm-studio"), "LM_STUDIO_API_KEY");
    }

    #[test]
    fn test_get_api_key_present() {
        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .with(eq("DEEPSEEK_API_KEY"))
            .times(1)
            .return_once(|_| Ok("sk-123".to_string()));

        let result = get_api_key("deepseek", &mock_env);
        assert!(matches!(result.as_deref(), Ok("sk-123")));
    }

    #[test]
    fn test_get_api_key_missing() {
        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .with(eq("GOOGLE_API_KEY"))
            .times(1)
            .return_once(|_| Err(env::VarError::NotPresent));

        let result = get_api_key("google", &mock_env);
        assert!(matches!(result, Err(KeyManagerError::NotPresent(name)) if name == "GOOGLE_API_KEY"));
    }

    #[test]
    fn test_get_api_key_blank_counts_as_missing() {
        let mut mock_env = MockEnvironment::new();
        mock_env
            .expect_get_var()
            .times(1)
            .return_once(|_| Ok("   ".to_string()));

        assert!(get_api_key("together", &mock_env).is_err());
    }
}
