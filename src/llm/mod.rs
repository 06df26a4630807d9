// ABOUTME: LLM module - client abstraction for language model providers.
// ABOUTME: Defines chat types, the client trait, and an OpenAI-compatible client.

mod client;
mod openai_compat;
mod types;

pub use client::*;
pub use openai_compat::*;
pub use types::*;
