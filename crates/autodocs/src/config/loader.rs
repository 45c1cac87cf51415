use std::path::Path;
use std::str::FromStr;

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_str(content)?;

    validate_settings(&settings)?;

    Ok(settings)
}

/// Loads settings from `path` (or defaults), applies process environment
/// overrides and validates the result.
pub fn load_settings_with_env(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(p) => load_settings(p)?,
        None => Settings::default(),
    };

    apply_overrides(&mut settings, |name| std::env::var(name).ok())?;
    validate_settings(&settings)?;

    Ok(settings)
}

/// Applies environment overrides read through `lookup`.
///
/// Empty values are ignored, except `DOWNLOAD_TOKEN` where an empty value
/// clears the token.
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("ENVIRONMENT") {
        settings.environment = v;
    }
    if let Some(v) = get("DATABASE_PATH") {
        settings.database_path = v;
    }
    if let Some(v) = get("UPLOADS_DIR") {
        settings.uploads_dir = v;
    }
    if let Some(v) = get("ARTIFACTS_DIR") {
        settings.artifacts_dir = v;
    }
    if let Some(v) = lookup("DOWNLOAD_TOKEN") {
        settings.download_token = Some(v).filter(|t| !t.is_empty());
    }
    if let Some(v) = get("SAFE_MODE") {
        settings.safe_mode = parse_bool("SAFE_MODE", &v)?;
    }
    if let Some(v) = get("OPENAI_BASE_URL") {
        settings.provider.base_url = v;
    }
    if let Some(v) = get("MODEL_NAME") {
        settings.provider.model = v;
    }
    if let Some(v) = get("MAX_RETRIES") {
        settings.retry.max_retries = parse_num("MAX_RETRIES", &v)?;
    }
    if let Some(v) = get("RETRY_BACKOFF_SECS") {
        settings.retry.backoff_base_secs = parse_num("RETRY_BACKOFF_SECS", &v)?;
    }
    if let Some(v) = get("WORKER_COUNT") {
        settings.worker_count = parse_num("WORKER_COUNT", &v)?;
    }

    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(name, value)),
    }
}

fn parse_num<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid_env(name, value))
}

fn invalid_env(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.worker_count == 0 {
        return Err(validation("workerCount must be at least 1"));
    }

    for (name, value) in [
        ("databasePath", &settings.database_path),
        ("uploadsDir", &settings.uploads_dir),
        ("artifactsDir", &settings.artifacts_dir),
    ] {
        if value.trim().is_empty() {
            return Err(validation(format!("{} must not be empty", name)));
        }
    }

    let provider = &settings.provider;
    if provider.direct_max_attempts == 0 {
        return Err(validation("provider.directMaxAttempts must be at least 1"));
    }
    if !(0.0..=2.0).contains(&provider.temperature) {
        return Err(validation(format!(
            "provider.temperature must be between 0 and 2, got {}",
            provider.temperature
        )));
    }
    if provider.model.trim().is_empty() {
        return Err(validation("provider.model must not be empty"));
    }
    match reqwest::Url::parse(&provider.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(validation(format!(
                "provider.baseUrl must use http or https, got '{}'",
                url.scheme()
            )))
        }
        Err(e) => {
            return Err(validation(format!(
                "provider.baseUrl '{}' is not a valid URL: {}",
                provider.base_url, e
            )))
        }
    }

    for (i, route) in settings.routes.iter().enumerate() {
        if route.method.trim().is_empty() || route.path.trim().is_empty() {
            return Err(validation(format!(
                "routes[{}] needs both a method and a path",
                i
            )));
        }
    }

    Ok(())
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_valid_settings() {
        let json = r#"
        {
            "environment": "staging",
            "uploadsDir": "/data/uploads",
            "artifactsDir": "/data/artifacts",
            "workerCount": 2,
            "provider": { "model": "gpt-4o", "baseUrl": "http://localhost:8080/v1" },
            "routes": [
                { "method": "GET", "path": "/health", "summary": "Liveness" }
            ]
        }
        "#;

        let settings = load_settings_from_str(json).unwrap();
        assert_eq!(settings.environment, "staging");
        assert_eq!(settings.uploads_dir, "/data/uploads");
        assert_eq!(settings.worker_count, 2);
        assert_eq!(settings.provider.model, "gpt-4o");
        assert_eq!(settings.routes.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autodocs.json");
        std::fs::write(&path, r#"{ "safeMode": true }"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert!(settings.safe_mode);
    }

    #[test]
    fn test_missing_file() {
        let err = load_settings("/nonexistent/autodocs.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = load_settings_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(load_settings_from_str(r#"{ "workerCount": 0 }"#).is_err());
    }

    #[test]
    fn test_zero_direct_attempts_rejected() {
        assert!(load_settings_from_str(r#"{ "provider": { "directMaxAttempts": 0 } }"#).is_err());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        assert!(load_settings_from_str(r#"{ "provider": { "temperature": 3.5 } }"#).is_err());
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        assert!(load_settings_from_str(r#"{ "provider": { "baseUrl": "ftp://example.com" } }"#).is_err());
        assert!(load_settings_from_str(r#"{ "provider": { "baseUrl": "not a url" } }"#).is_err());
    }

    #[test]
    fn test_empty_route_rejected() {
        let json = r#"{ "routes": [ { "method": "", "path": "/x", "summary": "" } ] }"#;
        assert!(load_settings_from_str(json).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("ENVIRONMENT", "production"),
                ("UPLOADS_DIR", "/srv/uploads"),
                ("ARTIFACTS_DIR", "/srv/artifacts"),
                ("DOWNLOAD_TOKEN", "tok"),
                ("SAFE_MODE", "true"),
                ("OPENAI_BASE_URL", "https://openrouter.ai/api/v1"),
                ("MODEL_NAME", "gpt-4.1"),
                ("MAX_RETRIES", "2"),
                ("RETRY_BACKOFF_SECS", "5"),
                ("WORKER_COUNT", "3"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.environment, "production");
        assert_eq!(settings.uploads_dir, "/srv/uploads");
        assert_eq!(settings.artifacts_dir, "/srv/artifacts");
        assert_eq!(settings.download_token.as_deref(), Some("tok"));
        assert!(settings.safe_mode);
        assert_eq!(settings.provider.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(settings.provider.model, "gpt-4.1");
        assert_eq!(settings.retry.max_retries, 2);
        assert_eq!(settings.retry.backoff_base_secs, 5);
        assert_eq!(settings.worker_count, 3);
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let mut settings = Settings::default();
        apply_overrides(&mut settings, env(&[("MODEL_NAME", "  "), ("SAFE_MODE", "")])).unwrap();
        assert_eq!(settings.provider.model, "gpt-4o-mini");
        assert!(!settings.safe_mode);
    }

    #[test]
    fn test_empty_download_token_clears() {
        let mut settings = Settings {
            download_token: Some("old".to_string()),
            ..Default::default()
        };
        apply_overrides(&mut settings, env(&[("DOWNLOAD_TOKEN", "")])).unwrap();
        assert!(settings.download_token.is_none());
    }

    #[test]
    fn test_invalid_override_values() {
        let mut settings = Settings::default();
        let err = apply_overrides(&mut settings, env(&[("MAX_RETRIES", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "MAX_RETRIES"));

        let err = apply_overrides(&mut settings, env(&[("SAFE_MODE", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "SAFE_MODE"));
    }
}
