//! services/api/src/adapters/generator_llm.rs
//!
//! This module contains the adapter for the study-set generating LLM.
//! It implements the `GenerationService` port from the `core` crate by
//! streaming a chat completion and forwarding each content delta as a chunk.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a study-set generator for students.

You write flashcards or multiple choice quiz questions exactly in the format the user asks for.

Output rules:
- Write one JSON object per line, and nothing else on that line.
- Never wrap the objects in an array, a code block, or any other container.
- Never split one object across several lines.
- Write every question first, then the single title/description object as the very last line.
- Keep every field a plain string (incorrect_answers is a list of plain strings)."#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use study_set_core::ports::{GenerationService, PortError, PortResult, TextStream};
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGeneratorAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGeneratorAdapter {
    /// Creates a new `OpenAiGeneratorAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `GenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationService for OpenAiGeneratorAdapter {
    /// Opens a streaming completion for the prompt.
    async fn generate_stream(&self, prompt: &str) -> PortResult<TextStream> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .stream(true)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!(model = %self.model, "Opening generation stream");

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let completion = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        let chunks = completion.filter_map(|item| async move {
            match item {
                Ok(response) => {
                    let text: String = response
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect();
                    (!text.is_empty()).then_some(Ok(text))
                }
                Err(e) => Some(Err(PortError::Unavailable(e.to_string()))),
            }
        });

        Ok(Box::pin(chunks))
    }
}
