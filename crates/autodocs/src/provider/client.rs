use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

use super::{send_chat, wire, ChatRequest, ProviderError};
use crate::config::ProviderSettings;

/// Pre-configured chat completion client.
///
/// Construction validates everything a call needs up front: the endpoint
/// URL, the bearer header and the HTTP client itself.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: Url,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(settings: &ProviderSettings, api_key: &SecretString) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(&wire::chat_url(&settings.base_url)).map_err(|e| {
            ProviderError::ClientBuild(format!("invalid base URL '{}': {}", settings.base_url, e))
        })?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|_| {
                ProviderError::ClientBuild(
                    "API key contains characters that are not valid in an HTTP header".to_string(),
                )
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One completion call, no retries.
    pub fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest::user(&self.model, prompt, self.temperature);
        tracing::debug!(model = %self.model, "Sending chat completion request");
        send_chat(self.http.post(self.endpoint.clone()), &body)
    }
}
