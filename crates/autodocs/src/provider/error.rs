//! Provider error types.

use std::time::Duration;

use thiserror::Error;

/// Errors from text-generation provider calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered HTTP 429.
    #[error("Provider rate limit exceeded: {message}")]
    RateLimited {
        /// Seconds from the `Retry-After` header, when present.
        retry_after: Option<u64>,
        message: String,
    },

    /// Any other non-success HTTP status.
    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, timeout or request-building failure.
    #[error("Provider request failed: {0}")]
    Transport(String),

    /// The response could not be decoded or carried no text.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Failed to build provider client: {0}")]
    ClientBuild(String),
}

impl ProviderError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// Provider-supplied wait hint for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => {
                retry_after.map(Duration::from_secs)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_rate_limited() {
        assert!(ProviderError::rate_limited("slow down").is_rate_limited());
        assert!(!ProviderError::Http {
            status: 500,
            body: String::new()
        }
        .is_rate_limited());
        assert!(!ProviderError::Transport("refused".into()).is_rate_limited());
    }

    #[test]
    fn test_retry_after() {
        let err = ProviderError::RateLimited {
            retry_after: Some(7),
            message: String::new(),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(ProviderError::rate_limited("x").retry_after(), None);
        assert_eq!(ProviderError::InvalidResponse("x".into()).retry_after(), None);
    }
}
