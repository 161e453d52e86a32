//! Response generation
//!
//! The conversation step asks a [`ResponseGenerator`] for a reply and a mood
//! tag. [`OpenAiGenerator`] calls an OpenAI-compatible chat-completions API in
//! JSON-object mode.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use robo_types::Reply;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument, warn};

use crate::error::FleetError;

/// Mood tags a robot can display
pub const MOODS: [&str; 6] = ["happy", "sad", "excited", "thoughtful", "confused", "neutral"];

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "You are the conversation engine of a friendly robot. \
Answer with a single valid JSON object with exactly two keys: \"reply\" and \"mood\". \
\"reply\" holds your answer to the user's message. \
\"mood\" holds ONE of: happy, sad, excited, thoughtful, confused, neutral, matching the tone of the reply. \
Example: {\"reply\": \"The sky is blue because sunlight scatters in the air.\", \"mood\": \"thoughtful\"}";

/// Output of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub reply: Reply,
    /// Tokens consumed, recorded on the conversation log
    pub cost: f64,
}

/// Produces a reply for a robot prompt
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply. Failures and unusable output are `FleetError::Generation`.
    async fn generate(&self, prompt: &str) -> Result<Generated, FleetError>;
}

/// OpenAI-compatible chat-completions generator
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiGenerator {
    /// Create a generator with the default model and endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 150,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL (without `/chat/completions`)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    #[serde(default)]
    reply: String,
    #[serde(default)]
    mood: String,
}

/// Parse the model's JSON content into a [`Reply`].
///
/// Empty fields are rejected. Moods outside [`MOODS`] read as `neutral`.
pub fn parse_reply(content: &str) -> Result<Reply, FleetError> {
    let payload: ReplyPayload = serde_json::from_str(content.trim())
        .map_err(|e| FleetError::Generation(format!("malformed reply JSON: {e}")))?;

    let reply = payload.reply.trim();
    let mood = payload.mood.trim().to_lowercase();
    if reply.is_empty() || mood.is_empty() {
        return Err(FleetError::Generation("incomplete reply".to_string()));
    }

    let mood = if MOODS.contains(&mood.as_str()) {
        mood
    } else {
        debug!(mood = %mood, "Unrecognized mood, using neutral");
        "neutral".to_string()
    };

    Ok(Reply::new(reply, mood))
}

#[async_trait]
impl ResponseGenerator for OpenAiGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<Generated, FleetError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "response_format": { "type": "json_object" },
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Completion request failed");
                FleetError::Generation(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Completion API error");
            return Err(FleetError::Generation(format!(
                "completion API error: {status}"
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse completion response");
            FleetError::Generation(e.to_string())
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                warn!("Completion returned no choices");
                FleetError::Generation("completion returned no choices".to_string())
            })?;

        let reply = parse_reply(&content)?;
        let cost = completion.usage.map_or(0.0, |u| u.total_tokens as f64);

        Ok(Generated { reply, cost })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        let reply = parse_reply(r#"{"reply": "Olá!", "mood": "Happy"}"#).unwrap();
        assert_eq!(reply, Reply::new("Olá!", "happy"));
    }

    #[test]
    fn test_unknown_mood_is_neutral() {
        let reply = parse_reply(r#"{"reply": "hm", "mood": "grumpy"}"#).unwrap();
        assert_eq!(reply.mood, "neutral");
    }

    #[test]
    fn test_incomplete_reply_rejected() {
        assert!(parse_reply(r#"{"reply": "", "mood": "happy"}"#).is_err());
        assert!(parse_reply(r#"{"reply": "hi"}"#).is_err());
        assert!(parse_reply("not json").is_err());
    }
}
