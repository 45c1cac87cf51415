use std::path::PathBuf;

use secrecy::SecretString;

use crate::config::{ProviderSettings, RouteEntry, Settings};
use crate::secrets::{self, SecretError};
use crate::worker::RetryPolicy;

/// Everything a pipeline run reads from configuration, with the provider
/// key already resolved.
#[derive(Debug)]
pub struct PipelineConfig {
    pub uploads_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub safe_mode: bool,
    pub provider: ProviderSettings,
    pub api_key: Option<SecretString>,
    pub routes: Vec<RouteEntry>,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, SecretError> {
        Self::from_settings_with(settings, |name| std::env::var(name).ok())
    }

    /// Like [`PipelineConfig::from_settings`] with an explicit environment lookup.
    pub fn from_settings_with<F>(settings: &Settings, lookup: F) -> Result<Self, SecretError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = secrets::resolve_provider_key(&settings.provider, lookup)?;

        Ok(Self {
            uploads_dir: PathBuf::from(&settings.uploads_dir),
            artifacts_dir: PathBuf::from(&settings.artifacts_dir),
            safe_mode: settings.safe_mode,
            provider: settings.provider.clone(),
            api_key,
            routes: settings.routes.clone(),
            retry: RetryPolicy::from_settings(&settings.retry),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
