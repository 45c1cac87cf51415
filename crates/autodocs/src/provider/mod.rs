//! OpenAI-compatible text-generation provider.
//!
//! Two callers share the wire format: [`ChatClient`] is a pre-configured
//! client with auth baked into its default headers, [`DirectCaller`] issues
//! one-off requests and retries rate-limited calls itself.

pub mod client;
pub mod direct;
pub mod error;
pub mod wire;

pub use client::ChatClient;
pub use direct::DirectCaller;
pub use error::ProviderError;
pub use wire::{build_prompt, chat_url, ChatRequest};

use reqwest::blocking::RequestBuilder;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Sends a chat request and returns the completion text.
///
/// HTTP 429 maps to [`ProviderError::RateLimited`], carrying the
/// `Retry-After` seconds when the header is a plain integer.
pub(crate) fn send_chat(
    request: RequestBuilder,
    body: &ChatRequest,
) -> Result<String, ProviderError> {
    let response = request.json(body).send()?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response.text().unwrap_or_default();
        return Err(ProviderError::RateLimited {
            retry_after,
            message: truncate_body(&text),
        });
    }

    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body: truncate_body(&text),
        });
    }

    let parsed: wire::ChatResponse = response
        .json()
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    parsed.into_text()
}

fn truncate_body(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY).collect()
}
