use crate::configuration::{RouterKind, Settings};
use anyhow::{Context, Result};
use seek::agent::Agent;
use seek::interaction::Interaction;
use seek::providers::factory::get_provider;
use seek::router::{Classifier, KeywordClassifier, LlmClassifier};
use std::sync::Arc;
use tracing::info;

/// Build the provider, the agents and the classifier described by `settings`.
/// Fails on an unknown backend or a missing cloud credential.
pub fn build_interaction(settings: &Settings) -> Result<Interaction> {
    let provider = get_provider(settings.provider.clone().into_config())
        .context("failed to set up the provider")?;

    let work_dir = settings.agent.work_dir()?;
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("failed to create work directory {}", work_dir.display()))?;

    let languages = settings.agent.languages();
    let personality = &settings.agent.personality;
    let agents = vec![
        Agent::casual(&settings.agent.name, provider.clone()),
        Agent::coder("Coder", provider.clone(), &work_dir),
        Agent::file("File Agent", provider.clone(), &work_dir),
    ]
    .into_iter()
    .map(|agent| {
        agent
            .with_max_attempts(settings.agent.max_attempts)
            .with_prompt(personality, &languages)
    })
    .collect::<Result<Vec<_>, _>>()?;

    let classifier: Box<dyn Classifier> = match settings.agent.router {
        RouterKind::Keyword => Box::new(KeywordClassifier::new()),
        RouterKind::Llm => Box::new(LlmClassifier::new(provider.clone())),
    };

    let interaction = Interaction::new(agents, classifier)?;
    info!(
        agents = ?interaction.agent_names(),
        provider = provider.name(),
        model = provider.model(),
        work_dir = %work_dir.display(),
        "interaction ready"
    );
    Ok(interaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("SEEK_") {
                env::remove_var(&key);
            }
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_builds_all_agents() {
        clean_env();
        let work_dir = tempfile::tempdir().unwrap();
        let nested = work_dir.path().join("workspace");
        env::set_var("SEEK_PROVIDER__NAME", "test");
        env::set_var("SEEK_AGENT__NAME", "Friday");
        env::set_var("SEEK_AGENT__WORK_DIR", nested.display().to_string());

        let settings = Settings::new().unwrap();
        let interaction = build_interaction(&settings).unwrap();
        assert_eq!(
            interaction.agent_names(),
            vec!["Friday", "Coder", "File Agent"]
        );
        assert!(nested.is_dir());

        let record = interaction.ask("hello there").await.unwrap();
        assert_eq!(record.agent_name, "Friday");
        assert!(record.success);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_unknown_provider_fails_startup() {
        clean_env();
        let work_dir = tempfile::tempdir().unwrap();
        env::set_var("SEEK_PROVIDER__NAME", "skynet");
        env::set_var("SEEK_AGENT__WORK_DIR", work_dir.path().display().to_string());

        let settings = Settings::new().unwrap();
        let err = build_interaction(&settings).err().unwrap();
        assert!(format!("{:#}", err).contains("Unknown provider: skynet"));

        clean_env();
    }
}
