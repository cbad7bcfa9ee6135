//! Bounded tool-use loop for entity questions.
//!
//! One round: send the conversation plus the capability definitions, then
//! either return the model's text answer or execute every requested
//! capability call in parallel (calls within a round are independent),
//! append the results, and go again. The loop is bounded; a model that
//! never stops calling capabilities fails the run instead of spinning.

use futures::future::join_all;
use tracing::{debug, info};

use crate::error::AlignError;
use crate::retry::RetryConfig;
use crate::tools::core::ToolSet;
use crate::{AzureChatClient, ChatRequest, Message};

/// System prompt for the ask loop.
pub const ASK_SYSTEM_PROMPT: &str = "\
You answer questions about Wikidata entities. Use the available \
capabilities to resolve names to entity ids and to read or summarize \
entity statements; do not answer from memory when a lookup is possible. \
Cite entity ids (like Q28) next to the entities they identify. If the \
statements do not support an answer, say so.";

/// Limits for one ask run.
#[derive(Debug, Clone)]
pub struct AskConfig {
    /// Maximum capability round-trips before giving up.
    pub max_rounds: u32,
    /// Maximum tokens per model response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Retry policy for the underlying chat calls.
    pub retry: RetryConfig,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            max_tokens: 1024,
            temperature: 0.7,
            retry: RetryConfig::default(),
        }
    }
}

/// The ask loop: a chat client, a capability set, and limits.
pub struct AskAgent<'a> {
    client: &'a AzureChatClient,
    tools: &'a ToolSet,
    config: AskConfig,
}

impl<'a> AskAgent<'a> {
    pub fn new(client: &'a AzureChatClient, tools: &'a ToolSet, config: AskConfig) -> Self {
        Self {
            client,
            tools,
            config,
        }
    }

    /// Answer one question, looping over capability calls as needed.
    pub async fn run(&self, question: &str) -> Result<String, AlignError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![Message::system(ASK_SYSTEM_PROMPT), Message::user(question)];

        for round in 1..=self.config.max_rounds {
            let request = ChatRequest {
                messages: messages.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                tools: (!definitions.is_empty()).then(|| definitions.clone()),
                ..Default::default()
            };

            let completion = self.client.chat_with_retry(&request, &self.config.retry).await?;

            if completion.tool_calls.is_empty() {
                debug!("round {round}: text answer");
                return Ok(completion.content.unwrap_or_default());
            }

            info!(
                "round {round}: {} capability call(s)",
                completion.tool_calls.len()
            );
            messages.push(Message::assistant_tool_calls(completion.tool_calls.clone()));

            // Calls within a round have no ordering dependency; run them
            // together and join before the next round.
            let calls: Vec<_> = completion
                .tool_calls
                .iter()
                .map(|call| {
                    let name = call.function.name.clone();
                    let arguments = call.function.arguments.clone();
                    let call_id = call.id.clone();
                    async move {
                        let result = self.tools.execute(&name, &arguments).await;
                        (call_id, result)
                    }
                })
                .collect();

            for (call_id, result) in join_all(calls).await {
                messages.push(Message::tool_result(call_id, result));
            }
        }

        Err(AlignError::Generation(format!(
            "no final answer after {} rounds",
            self.config.max_rounds
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let config = AskConfig::default();
        assert_eq!(config.max_rounds, 10);
        assert!(config.max_tokens > 0);
    }

    #[test]
    fn system_prompt_forbids_answering_from_memory() {
        assert!(ASK_SYSTEM_PROMPT.contains("do not answer from memory"));
    }
}
