//! OpenAI-compatible chat completion wire format.

use serde::{Deserialize, Serialize};

use super::ProviderError;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl ChatRequest {
    /// A single-turn request carrying `prompt` as the user message.
    pub fn user(model: &str, prompt: &str, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice. Empty or missing text is an invalid response.
    pub fn into_text(self) -> Result<String, ProviderError> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "completion contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Chat completions endpoint under `base_url`.
pub fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Prompt sent for one artifact.
pub fn build_prompt(context: &str, instruction: &str) -> String {
    format!(
        "You are AutoDocs, an assistant that drafts developer documentation.\n\
         Use the provided code context to keep names accurate.\n\n\
         Project context:\n{}\n\n\
         Task: {}\nKeep output tight and actionable.",
        context, instruction
    )
}
