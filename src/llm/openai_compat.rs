// ABOUTME: Client for OpenAI-compatible chat completion endpoints (OpenAI,
// ABOUTME: NVIDIA NIM, vLLM, ...). Implements the LlmClient trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmClient, Message, Request, Response, Role, StopReason, Usage};
use crate::error::LlmError;

/// Default endpoint when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completion request wire format.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

/// Message wire format.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completion response wire format.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<WireChoice>,
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub struct WireChoice {
    pub message: WireMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// API error response.
#[derive(Debug, Deserialize)]
pub struct WireError {
    pub error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct WireErrorDetail {
    pub message: String,
}

/// Client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for the given base URL (e.g. `https://integrate.api.nvidia.com/v1`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LlmError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, api_key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        WireMessage {
            role: role_name(msg.role).to_string(),
            content: Some(msg.content.clone()),
        }
    }
}

impl From<&Request> for ChatCompletionRequest {
    fn from(req: &Request) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);

        if let Some(ref system) = req.system {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        messages.extend(req.messages.iter().map(WireMessage::from));

        ChatCompletionRequest {
            model: req.model.clone(),
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            stop: req.stop.clone(),
        }
    }
}

fn parse_stop_reason(s: Option<&str>) -> StopReason {
    match s {
        Some("length") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

impl TryFrom<ChatCompletionResponse> for Response {
    type Error = LlmError;

    fn try_from(resp: ChatCompletionResponse) -> Result<Self, Self::Error> {
        let choice = resp.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(Response {
            id: resp.id,
            model: resp.model,
            text: choice.message.content.unwrap_or_default(),
            stop_reason: parse_stop_reason(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let wire_req = ChatCompletionRequest::from(req);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&wire_req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<WireError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let wire_resp: ChatCompletionResponse = response.json().await?;
        Response::try_from(wire_resp)
    }
}
