use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};

use super::{send_chat, wire, ChatRequest, ProviderError};
use crate::config::ProviderSettings;

/// Raw HTTP caller used when a [`super::ChatClient`] cannot be built.
///
/// Every call builds its own request. Rate-limited calls are retried with
/// doubling backoff; any other failure is returned immediately.
#[derive(Debug)]
pub struct DirectCaller {
    http: Client,
    url: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    max_attempts: u32,
    backoff_base: Duration,
}

impl DirectCaller {
    pub fn new(settings: &ProviderSettings, api_key: SecretString) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            url: wire::chat_url(&settings.base_url),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_attempts: settings.direct_max_attempts.max(1),
            backoff_base: Duration::from_millis(settings.direct_backoff_base_ms),
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the given failed attempt (1-based): base, 2×base, 4×base, ...
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exp)
    }

    /// Completion with rate-limit retries.
    pub fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest::user(&self.model, prompt, self.temperature);

        let mut attempt = 1;
        loop {
            let request = self
                .http
                .post(&self.url)
                .bearer_auth(self.api_key.expose_secret());

            match send_chat(request, &body) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limited() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    log::warn!(
                        "Provider rate limited (attempt {}/{}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) if e.is_rate_limited() => {
                    return Err(ProviderError::RateLimited {
                        retry_after: e.retry_after().map(|d| d.as_secs()),
                        message: format!("still rate limited after {} attempts", attempt),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
