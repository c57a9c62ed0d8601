//! Model-calling transport for Feedback Descent.
//!
//! Domains talk to models through the [`ChatModel`] trait. [`LlmClient`] is
//! the HTTP implementation, speaking the Anthropic Messages API or any
//! OpenAI-compatible Chat Completions endpoint.

#![warn(missing_docs)]

pub mod client;
pub mod error;

pub use client::{ChatModel, GenerateOptions, ImageInput, LlmClient, Provider};
pub use error::LlmError;
