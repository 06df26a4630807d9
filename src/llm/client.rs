// ABOUTME: Defines the LlmClient trait - the abstraction layer that lets the
// ABOUTME: agent talk to any chat-completion provider.

use async_trait::async_trait;

use super::{Request, Response};
use crate::error::LlmError;

/// Trait for LLM client implementations.
///
/// Network-level retries, if any, belong to the implementation; callers
/// treat every error as final for that request.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Create a chat completion.
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError>;
}
