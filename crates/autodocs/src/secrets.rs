//! Provider credential resolution.
//!
//! A secret is taken from the first source that is configured:
//!
//! 1. **Direct value** - e.g. `"apiKey": "sk-..."` for local testing
//! 2. **File reference** - Docker secrets, e.g. `"apiKeyFile": "/run/secrets/openai"`
//! 3. **Env var reference** - e.g. `"apiKeyEnv": "OPENAI_API_KEY"`

use secrecy::SecretString;
use std::fs;

use crate::config::ProviderSettings;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves an optional secret. Returns `Ok(None)` when no source yields a
/// non-empty value. A configured file that cannot be read is an error.
///
/// `lookup` reads environment variables; pass `|n| std::env::var(n).ok()`
/// in production.
pub fn resolve_secret<F>(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
    lookup: F,
) -> Result<Option<SecretString>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = direct.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(Some(SecretString::from(value.to_string())));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path, &lookup);
        let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            path: expanded.clone(),
            source: e,
        })?;
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            return Ok(Some(SecretString::from(trimmed.to_string())));
        }
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        // Env vars may carry trailing newlines from secret mounts.
        if let Some(value) = lookup(name).map(|v| v.trim().to_string()) {
            if !value.is_empty() {
                return Ok(Some(SecretString::from(value)));
            }
        }
    }

    Ok(None)
}

/// Resolves the provider API key from its configured sources.
pub fn resolve_provider_key<F>(provider: &ProviderSettings, lookup: F) -> Result<Option<SecretString>>
where
    F: Fn(&str) -> Option<String>,
{
    resolve_secret(
        provider.api_key.as_deref(),
        provider.api_key_file.as_deref(),
        provider.api_key_env.as_deref(),
        lookup,
    )
}

/// Expands a leading `~` to the user's home directory (HOME, then USERPROFILE).
fn expand_home<F>(path: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = lookup("HOME").or_else(|| lookup("USERPROFILE")) {
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
