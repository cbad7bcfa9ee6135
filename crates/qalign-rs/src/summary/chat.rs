//! Chat-backed [`Summarize`] implementation.

use crate::config::AlignConfig;
use crate::error::AlignError;
use crate::retry::RetryConfig;
use crate::summary::pipeline::{Summarize, SummaryFuture};
use crate::summary::prompts::{MAP_PROMPT, REDUCE_PROMPT};
use crate::{AzureChatClient, ChatRequest, Message};

/// Summarizer backed by an Azure OpenAI chat deployment.
///
/// Each map/reduce operation is one chat call: the fixed instruction as the
/// system message, the unit (or the batch joined with line breaks) as the
/// user message. Transient failures are retried inside the client; anything
/// that survives the retry budget propagates as a generation error.
pub struct ChatSummarizer<'a> {
    client: &'a AzureChatClient,
    temperature: f32,
    max_tokens: u32,
    retry: RetryConfig,
}

impl<'a> ChatSummarizer<'a> {
    pub fn new(client: &'a AzureChatClient, config: &AlignConfig) -> Self {
        Self {
            client,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy (builder pattern).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, instruction: &str, content: String) -> Result<String, AlignError> {
        let request = ChatRequest {
            messages: vec![Message::system(instruction), Message::user(content)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..Default::default()
        };
        let completion = self.client.chat_with_retry(&request, &self.retry).await?;
        // An empty reply is a valid outcome for the map instruction.
        Ok(completion.content.unwrap_or_default())
    }
}

impl Summarize for ChatSummarizer<'_> {
    fn map(&self, unit: &str) -> SummaryFuture<'_> {
        let content = unit.to_string();
        Box::pin(async move { self.complete(MAP_PROMPT, content).await })
    }

    fn reduce(&self, summaries: &[String]) -> SummaryFuture<'_> {
        let content = summaries.join("\n");
        Box::pin(async move { self.complete(REDUCE_PROMPT, content).await })
    }
}
