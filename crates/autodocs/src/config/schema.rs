use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime settings for the worker and the API facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub environment: String,
    pub database_path: String,
    pub uploads_dir: String,
    pub artifacts_dir: String,
    /// When set, artifact downloads require `Authorization: Bearer <token>`.
    pub download_token: Option<String>,
    /// Skip the provider entirely and document the service's own routes.
    pub safe_mode: bool,
    pub worker_count: usize,
    pub retry: RetrySettings,
    pub provider: ProviderSettings,
    /// Route manifest used by offline generation.
    pub routes: Vec<RouteEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_path: "storage/autodocs.db".to_string(),
            uploads_dir: "storage/uploads".to_string(),
            artifacts_dir: "storage/artifacts".to_string(),
            download_token: None,
            safe_mode: false,
            worker_count: default_worker_count(),
            retry: RetrySettings::default(),
            provider: ProviderSettings::default(),
            routes: default_routes(),
        }
    }
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

/// Run-level retry policy for rate-limited jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base_secs: 60,
        }
    }
}

/// OpenAI-compatible chat completion provider.
///
/// The API key is resolved from `apiKey`, then `apiKeyFile`, then the
/// environment variable named by `apiKeyEnv`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub api_key_file: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    /// Attempts per artifact on the direct-call path.
    pub direct_max_attempts: u32,
    pub direct_backoff_base_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_file: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            request_timeout_secs: 30,
            direct_max_attempts: 3,
            direct_backoff_base_ms: 2000,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_file", &self.api_key_file)
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("direct_max_attempts", &self.direct_max_attempts)
            .field("direct_backoff_base_ms", &self.direct_backoff_base_ms)
            .finish()
    }
}

/// One entry of the service's own route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub method: String,
    pub path: String,
    pub summary: String,
}

impl RouteEntry {
    pub fn new(method: &str, path: &str, summary: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            summary: summary.to_string(),
        }
    }
}

/// Routes exposed by the AutoDocs service itself.
pub fn default_routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(
            "POST",
            "/api/jobs/upload",
            "Upload a code archive and start a documentation job.",
        ),
        RouteEntry::new("GET", "/api/jobs", "List jobs newest first with their artifacts."),
        RouteEntry::new("GET", "/api/jobs/{job_id}", "Fetch one job and its artifacts."),
        RouteEntry::new(
            "GET",
            "/api/jobs/{job_id}/artifacts/{filename}",
            "Download a generated artifact file.",
        ),
        RouteEntry::new(
            "POST",
            "/api/jobs/{job_id}/requeue",
            "Reset a job to pending and enqueue it again.",
        ),
        RouteEntry::new(
            "GET",
            "/api/debug/provider",
            "Report whether the text-generation provider is configured and resolvable.",
        ),
        RouteEntry::new(
            "POST",
            "/api/debug/reprocess-placeholders",
            "Re-enqueue jobs whose artifacts still hold placeholder text.",
        ),
        RouteEntry::new("GET", "/health", "Liveness probe."),
    ]
}
