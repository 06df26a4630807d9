// ABOUTME: ModelGateway - the controller's view of the language model, plus
// ABOUTME: LlmGateway, which drives any LlmClient with the ReAct prompt.

use std::sync::Arc;

use async_trait::async_trait;

use super::context::{AgentContext, TurnRole};
use super::prompt;
use crate::error::LlmError;
use crate::llm::{LlmClient, Message, Request, ToolDefinition};

/// Produces the model's next turn for a context and tool catalog.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(
        &self,
        context: &AgentContext,
        catalog: &[ToolDefinition],
    ) -> Result<String, LlmError>;
}

/// Sampling settings for an LlmGateway.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Gateway that formats the context as a chat conversation for an LlmClient.
pub struct LlmGateway {
    client: Arc<dyn LlmClient>,
    settings: ModelSettings,
    preamble: Option<String>,
}

impl LlmGateway {
    pub fn new(client: Arc<dyn LlmClient>, settings: ModelSettings) -> Self {
        Self {
            client,
            settings,
            preamble: None,
        }
    }

    /// Override the system prompt preamble.
    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Build the chat request for a context.
    pub fn build_request(&self, context: &AgentContext, catalog: &[ToolDefinition]) -> Request {
        let messages = context.turns().iter().map(|turn| match turn.role {
            TurnRole::Assistant => Message::assistant(&turn.content),
            TurnRole::User | TurnRole::Tool => Message::user(&turn.content),
        });

        let mut request = Request::new(&self.settings.model)
            .system(prompt::system_prompt(self.preamble.as_deref(), catalog))
            .messages(messages)
            .stop("Observation:");
        request.temperature = self.settings.temperature;
        request.top_p = self.settings.top_p;
        request.max_tokens = self.settings.max_tokens;
        request
    }
}

#[async_trait]
impl ModelGateway for LlmGateway {
    async fn complete(
        &self,
        context: &AgentContext,
        catalog: &[ToolDefinition],
    ) -> Result<String, LlmError> {
        let request = self.build_request(context, catalog);
        let response = self.client.create_message(&request).await?;
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "model responded"
        );
        Ok(response.text)
    }
}
