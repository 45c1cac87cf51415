//! Builders for settings and upload fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use autodocs::config::{RouteEntry, Settings};
use zip::write::SimpleFileOptions;

/// Builder for `Settings` pointing at a test directory.
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Defaults with no credentials from the environment and one worker.
    pub fn new() -> Self {
        let mut settings = Settings::default();
        settings.environment = "test".to_string();
        settings.worker_count = 1;
        settings.provider.api_key_env = None;
        settings.provider.request_timeout_secs = 5;
        settings.provider.direct_backoff_base_ms = 10;
        Self { settings }
    }

    pub fn safe_mode(mut self) -> Self {
        self.settings.safe_mode = true;
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.settings.provider.api_key = Some(key.to_string());
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.settings.provider.base_url = url.to_string();
        self
    }

    pub fn retry(mut self, max_retries: u32, backoff_base_secs: u64) -> Self {
        self.settings.retry.max_retries = max_retries;
        self.settings.retry.backoff_base_secs = backoff_base_secs;
        self
    }

    pub fn download_token(mut self, token: &str) -> Self {
        self.settings.download_token = Some(token.to_string());
        self
    }

    pub fn routes(mut self, routes: Vec<RouteEntry>) -> Self {
        self.settings.routes = routes;
        self
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.settings.worker_count = count;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Zip archive bytes holding `entries` as (name, content) pairs.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(content.as_bytes())
            .expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish zip").into_inner()
}

/// A chat-completions response body carrying `content`.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}
