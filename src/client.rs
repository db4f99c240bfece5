use crate::types::{CuratorError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// System message used for every scoring call.
pub const SYSTEM_PROMPT: &str = "You are a strict news filter that outputs JSON responses.";

/// Per-call options passed through to the provider.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Ask the provider for a guaranteed-JSON reply body.
    pub json_response: bool,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            json_response: true,
            temperature: 0.3,
            max_tokens: None,
        }
    }
}

/// The prediction capability the scoring engine is written against.
///
/// One production implementation talks to an OpenAI-compatible endpoint;
/// a scripted implementation backs the tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> String;

    /// Issue one chat completion and return the raw reply text. Transport
    /// and provider failures surface as `Err`; callers own degradation.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<String>;
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_batch_size() -> usize {
    5
}

/// Connection settings for the chat endpoint. Constructed explicitly and
/// owned by the client; there is no ambient global session.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiChatModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> String {
        self.config.model.clone()
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature,
            response_format: options
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
            max_tokens: options.max_tokens,
        };

        debug!("Sending chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(CuratorError::Chat(format!("HTTP {}: {}", status, body)));
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CuratorError::Chat("reply contained no choices".to_string()))?;

        Ok(content)
    }
}

/// Scripted chat model for development and tests: replays a queue of
/// canned replies and records every call it receives.
#[derive(Default)]
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful raw reply.
    pub fn push_reply(&self, raw: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .push_back(Ok(raw.into()));
    }

    /// Queue a transport-style failure.
    pub fn push_failure(&self, detail: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .push_back(Err(CuratorError::Chat(detail.into())));
    }

    /// Total calls issued against this model so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every user prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("scripted prompt log poisoned")
            .clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn model_name(&self) -> String {
        "scripted".to_string()
    }

    async fn complete(
        &self,
        _system: &str,
        user: &str,
        _options: &CompletionOptions,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("scripted prompt log poisoned")
            .push(user.to_string());

        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(CuratorError::Chat("no scripted reply queued".to_string())))
    }
}
