use secrecy::{ExposeSecret, SecretString};

use crate::pipeline::PipelineConfig;
use crate::provider::{ChatClient, DirectCaller, ProviderError};

/// How a run produces its artifacts. Chosen once per run.
#[derive(Debug)]
pub enum GenerationStrategy {
    /// Safe mode: render the route manifest, no provider calls.
    Offline,
    /// Pre-built client; non-rate-limit failures degrade one artifact.
    Client(ChatClient),
    /// Credentials exist but no client could be built; raw calls with
    /// rate-limit retries, failures propagate.
    Direct(DirectCaller),
    /// No credentials: fixed placeholder text.
    Placeholder,
}

impl GenerationStrategy {
    /// First match wins: safe mode, buildable client, direct calls, placeholders.
    ///
    /// Fails only when neither a client nor a direct caller can be built,
    /// which the pipeline treats as fatal for the run.
    pub fn select(config: &PipelineConfig) -> Result<Self, ProviderError> {
        if config.safe_mode {
            return Ok(GenerationStrategy::Offline);
        }

        let Some(key) = config.api_key.as_ref() else {
            return Ok(GenerationStrategy::Placeholder);
        };

        match ChatClient::new(&config.provider, key) {
            Ok(client) => Ok(GenerationStrategy::Client(client)),
            Err(e) => {
                log::warn!("Falling back to direct provider calls: {}", e);
                let key = SecretString::from(key.expose_secret().to_string());
                let caller = DirectCaller::new(&config.provider, key)?;
                Ok(GenerationStrategy::Direct(caller))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GenerationStrategy::Offline => "offline",
            GenerationStrategy::Client(_) => "client",
            GenerationStrategy::Direct(_) => "direct",
            GenerationStrategy::Placeholder => "placeholder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn config(safe_mode: bool, key: Option<&str>, base_url: &str) -> PipelineConfig {
        let mut settings = Settings::default();
        settings.safe_mode = safe_mode;
        settings.provider.base_url = base_url.to_string();
        settings.provider.api_key = key.map(str::to_string);
        PipelineConfig::from_settings_with(&settings, |_| None).unwrap()
    }

    #[test]
    fn test_safe_mode_wins_over_credentials() {
        let strategy = GenerationStrategy::select(&config(true, Some("sk-test"), "https://api.openai.com/v1"))
            .unwrap();
        assert!(matches!(strategy, GenerationStrategy::Offline));
    }

    #[test]
    fn test_no_key_is_placeholder() {
        let strategy = GenerationStrategy::select(&config(false, None, "https://api.openai.com/v1"))
            .unwrap();
        assert!(matches!(strategy, GenerationStrategy::Placeholder));
    }

    #[test]
    fn test_valid_key_is_client() {
        let strategy = GenerationStrategy::select(&config(false, Some("sk-test"), "https://api.openai.com/v1"))
            .unwrap();
        assert_eq!(strategy.name(), "client");
    }

    #[test]
    fn test_unbuildable_client_falls_back_to_direct() {
        let mut cfg = config(false, None, "https://api.openai.com/v1");
        cfg.api_key = Some(SecretString::from("sk-bad\nkey".to_string()));
        let strategy = GenerationStrategy::select(&cfg).unwrap();
        assert_eq!(strategy.name(), "direct");
    }
}
