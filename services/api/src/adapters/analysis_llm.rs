//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the question-paper analysis LLM.
//! It implements the `AnalysisModel` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use campus_portal_core::ports::{AnalysisModel, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisModel` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `AnalysisModel` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisModel for OpenAiAnalysisAdapter {
    async fn complete_json(&self, system_prompt: &str, user_text: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Analysis LLM response contained no text content.".to_string())
            })
    }
}

//=========================================================================================
// Fallback When No API Key Is Configured
//=========================================================================================

/// Stands in for the model when `OPENAI_API_KEY` is unset; every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredAnalysisModel;

#[async_trait]
impl AnalysisModel for UnconfiguredAnalysisModel {
    async fn complete_json(&self, _system_prompt: &str, _user_text: &str) -> PortResult<String> {
        Err(PortError::Rule(
            "question paper analysis is not configured on this server".to_string(),
        ))
    }
}
