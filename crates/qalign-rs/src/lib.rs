//! Wikidata entity summarization and Q&A for knowledge-base alignment.
//!
//! `qalign-rs` does two things with a Wikidata entity and an Azure OpenAI
//! chat deployment:
//!
//! 1. **Summarize** — fetch the entity's property statements over SPARQL and
//!    reduce them to one alignment-oriented summary under a token budget,
//!    using hierarchical map-reduce: split the statements, summarize each
//!    piece in parallel, then collapse batches of summaries until the whole
//!    working set fits the budget. See [`summary::SummaryPipeline`].
//! 2. **Ask** — answer a free-form question about entities by running the
//!    chat model in a bounded tool-use loop over a small set of Wikidata
//!    capabilities (statement fetch, entity search, entity summarization).
//!    See [`agent::AskAgent`].
//!
//! # Getting started
//!
//! ```ignore
//! use qalign_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AlignError> {
//!     let config = AlignConfig::from_env()?;
//!     let chat = AzureChatClient::from_config(&config)?;
//!     let wikidata = WikidataClient::from_config(&config)?;
//!
//!     let statements = wikidata.entity_statements("Q42").await?;
//!     let summarizer = ChatSummarizer::new(&chat, &config);
//!     let summary = SummaryPipeline::new(&summarizer, &WordCount)
//!         .with_token_max(config.token_max)
//!         .run(&statements)
//!         .await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`summary`] | Budgeted splitter, batch partitioner, map-reduce convergence controller |
//! | [`wikidata`] | SPARQL statement fetch and entity search |
//! | [`tools`] | Capability registry: [`Tool`](tools::core::Tool) trait + [`ToolSet`](tools::core::ToolSet) dispatch |
//! | [`agent`] | Bounded tool-use loop for entity questions |
//! | [`config`] | Environment configuration, validated at construction |
//! | [`retry`] | Transient-error backoff for the chat client |
//! | [`size`] | Pluggable Size estimators (word count, char ratio) |
//!
//! The chat wire types and [`AzureChatClient`] live at the crate root.

pub mod agent;
pub mod config;
pub mod error;
pub mod prelude;
pub mod retry;
pub mod size;
pub mod summary;
pub mod tools;
pub mod wikidata;

use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::AlignConfig;
use crate::error::AlignError;
use crate::retry::{RetryConfig, is_transient_error};

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type implementing
/// `schemars::JsonSchema` — the bridge between typed capability arguments
/// and the schema the function-calling API expects.
///
/// # Example
///
/// ```
/// use qalign_rs::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct SearchArgs {
///     query: String,
/// }
///
/// let schema = json_schema_for::<SearchArgs>();
/// assert_eq!(schema["type"], "object");
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. The deployment is addressed in the URL,
/// not the body, so there is no model field; unset optional fields are
/// omitted from serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Capability definitions offered to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Capability definition sent to the API (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A capability invocation requested by the model.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorBody>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    message: String,
}

/// Clean return type from [`AzureChatClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an Azure OpenAI chat-completions deployment.
///
/// The deployment is addressed by URL:
/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={v}`,
/// authenticated with an `api-key` header.
#[derive(Clone)]
pub struct AzureChatClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl AzureChatClient {
    /// Create a client for one deployment.
    pub fn new(
        endpoint: impl AsRef<str>,
        deployment: impl AsRef<str>,
        api_version: impl AsRef<str>,
        api_key: impl Into<String>,
    ) -> Result<Self, AlignError> {
        let client = reqwest::Client::builder()
            .user_agent("qalign/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AlignError::Config(format!("failed to build HTTP client: {e}")))?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.as_ref().trim_end_matches('/'),
            deployment.as_ref(),
            api_version.as_ref(),
        );
        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
        })
    }

    /// Create a client from a validated [`AlignConfig`].
    pub fn from_config(config: &AlignConfig) -> Result<Self, AlignError> {
        Self::new(
            &config.endpoint,
            &config.deployment,
            &config.api_version,
            config.api_key.clone(),
        )
    }

    /// Send one chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, AlignError> {
        let tool_count = body.tools.as_ref().map_or(0, |t| t.len());
        debug!(
            "chat request: messages={}, tools={}, max_tokens={}, temp={}",
            body.messages.len(),
            tool_count,
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AlignError::Generation(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AlignError::Generation(format!("failed to read response: {e}")))?;

        debug!(
            "chat response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(AlignError::Generation(format!(
                "Azure OpenAI API HTTP {status}: {text}"
            )));
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)
            .map_err(|e| AlignError::Generation(format!("failed to parse response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(AlignError::Generation(format!(
                "Azure OpenAI API error: {}",
                err.message
            )));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        match parsed.choices.and_then(|c| c.into_iter().next()) {
            Some(c) => Ok(ChatCompletion {
                content: c.message.content,
                tool_calls: c.message.tool_calls.unwrap_or_default(),
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            }),
            None => Ok(ChatCompletion {
                content: None,
                tool_calls: vec![],
                usage: parsed.usage,
                finish_reason: None,
            }),
        }
    }

    /// Send a chat completion, retrying transient failures per `retry`.
    ///
    /// Permanent failures (400, 401, schema errors) are returned on the
    /// first attempt.
    pub async fn chat_with_retry(
        &self,
        body: &ChatRequest,
        retry: &RetryConfig,
    ) -> Result<ChatCompletion, AlignError> {
        let mut attempt = 0u32;
        loop {
            match self.chat(body).await {
                Ok(completion) => return Ok(completion),
                Err(e) if attempt < retry.max_retries && is_transient_error(&e.to_string()) => {
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        "transient chat failure (attempt {}/{}), retrying in {:.1}s: {e}",
                        attempt + 1,
                        retry.max_retries,
                        delay.as_secs_f64(),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content.as_deref(), Some("hello"));

        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);

        let tool = Message::tool_result("call-1", "result");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn chat_request_skips_unset_fields() {
        let req = ChatRequest {
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: 0.5,
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("top_p").is_none());
        assert!(json.get("tools").is_none());
        assert!(json.get("stop").is_none());
        assert!(json.get("model").is_none());
    }

    #[test]
    fn client_url_embeds_deployment_and_version() {
        let client = AzureChatClient::new(
            "https://myres.openai.azure.com/",
            "gpt-4o",
            "2024-02-15-preview",
            "secret",
        )
        .unwrap();
        assert_eq!(
            client.url,
            "https://myres.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn tool_def_constructor_sets_function_type() {
        let def = ToolDef::new("lookup", "Look something up", serde_json::json!({}));
        assert_eq!(def.tool_type, ToolType::Function);
        assert_eq!(def.function.name, "lookup");
    }
}
