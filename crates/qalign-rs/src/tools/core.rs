//! Capability abstraction for function-calling agents.
//!
//! The [`Tool`] trait is the "invoke an external capability discovered at
//! runtime by name" contract: a static definition (name, description, JSON
//! Schema) plus an async `execute`. A [`ToolSet`] collects capabilities and
//! handles listing ([`ToolSet::definitions`]), dispatch by name
//! ([`ToolSet::execute`]), argument validation, timeouts, and result
//! truncation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, trace};

use crate::ToolDef;

/// Maximum size (in bytes) for a capability result before truncation.
/// Statement CSV for a rich entity can run to megabytes; the model only
/// needs enough of it to answer.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 30_000;

/// Default timeout for one capability invocation.
pub const DEFAULT_TOOL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(90);

/// Boxed future returned by [`Tool::execute`].
///
/// Type alias to keep trait signatures and implementations readable.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

/// A capability the model can invoke via function-calling.
///
/// Errors are returned as `"Error: ..."` strings rather than panics; the
/// agent passes the string back to the model as a tool result either way,
/// and the model self-corrects.
pub trait Tool: Send + Sync {
    /// The definition sent to the model.
    fn definition(&self) -> ToolDef;

    /// Execute with the raw JSON arguments string.
    ///
    /// Uses a boxed future so the trait stays dyn-compatible.
    fn execute(&self, arguments: &str) -> ToolFuture<'_>;

    /// The capability's name (delegates to the definition).
    fn name(&self) -> String {
        self.definition().function.name.clone()
    }
}

/// A collection of capabilities dispatched by name.
pub struct ToolSet {
    tools: HashMap<String, Box<dyn Tool>>,
    max_result_bytes: usize,
    timeout: Option<std::time::Duration>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("max_result_bytes", &self.max_result_bytes)
            .finish()
    }
}

impl ToolSet {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            timeout: Some(DEFAULT_TOOL_TIMEOUT),
        }
    }

    /// Set the maximum result size in bytes before truncation.
    pub fn with_max_result_bytes(mut self, max: usize) -> Self {
        self.max_result_bytes = max;
        self
    }

    /// Set the per-invocation timeout. `None` disables timeouts.
    pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a capability. Replaces any existing one with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    /// Register a capability (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// List every capability definition: the discovery half of the
    /// contract, handed to the model with each request.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a capability by name: the other half of the contract.
    ///
    /// Arguments are validated against the declared schema before
    /// execution; validation failures come back as structured error
    /// strings so the model can self-correct. The result is truncated to
    /// `max_result_bytes`.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => return format!("Error: unknown capability '{name}'"),
        };

        if let Some(error) = validate_tool_arguments(tool.as_ref(), arguments) {
            return error;
        }

        log_tool_call(name, arguments);
        let start = std::time::Instant::now();

        let result = if let Some(limit) = self.timeout {
            match tokio::time::timeout(limit, tool.execute(arguments)).await {
                Ok(r) => r,
                Err(_) => {
                    info!(
                        "capability {name} timed out after {:.0}s",
                        limit.as_secs_f64()
                    );
                    format!(
                        "Error: capability '{name}' timed out after {:.0} seconds.",
                        limit.as_secs_f64()
                    )
                }
            }
        } else {
            tool.execute(arguments).await
        };

        debug!(
            "capability {name} completed in {:.0}ms ({} bytes)",
            start.elapsed().as_secs_f64() * 1000.0,
            result.len()
        );

        truncate_result(result, self.max_result_bytes)
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Validate arguments against the capability's declared JSON Schema.
///
/// Returns `None` if valid, or `Some(error_string)` formatted for the model.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &str) -> Option<String> {
    let args_value: serde_json::Value = match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            return Some(format!(
                "Error: invalid JSON arguments for capability '{}': {e}.",
                tool.name()
            ));
        }
    };

    let schema = tool.definition().function.parameters;
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(_) => return None, // An invalid schema skips validation.
    };

    let errors: Vec<String> = validator
        .iter_errors(&args_value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Error: argument validation failed for capability '{}':\n{}\n\
             Fix the arguments and try again.",
            tool.name(),
            errors.join("\n")
        ))
    }
}

/// Log a capability invocation at INFO level with truncated arguments.
fn log_tool_call(name: &str, arguments: &str) {
    let preview: String = arguments.chars().take(120).collect();
    info!(
        "[capability] {name}({preview}{})",
        if arguments.len() > 120 { "..." } else { "" }
    );
    trace!("[capability] {name} arguments: {arguments}");
}

/// Truncate a result to at most `max` bytes, appending a notice if trimmed.
pub fn truncate_result(s: String, max: usize) -> String {
    if s.len() > max {
        let end = if s.is_char_boundary(max) {
            max
        } else {
            (0..max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
        };
        format!(
            "{}...\n[truncated: {} bytes total]",
            s.get(..end).unwrap_or(""),
            s.len()
        )
    } else {
        s
    }
}

/// Parse raw JSON arguments into a typed struct.
///
/// Returns a formatted error string suitable for returning directly from
/// [`Tool::execute`].
pub fn parse_tool_args<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|e| {
        format!(
            "Error: invalid arguments: {e}. \
             Provide valid JSON matching the capability's parameter schema."
        )
    })
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    impl Tool for EchoTool {
        fn definition(&self) -> ToolDef {
            ToolDef::new(
                "echo",
                "Echo the input",
                serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            )
        }

        fn execute(&self, arguments: &str) -> ToolFuture<'_> {
            let text = serde_json::from_str::<serde_json::Value>(arguments)
                .ok()
                .and_then(|v| v["text"].as_str().map(String::from))
                .unwrap_or_else(|| "Error: no text".into());
            Box::pin(async move { text })
        }
    }

    #[test]
    fn name_comes_from_definition() {
        assert_eq!(EchoTool.name(), "echo");
    }

    #[test]
    fn definitions_list_every_capability() {
        let set = ToolSet::new().with(EchoTool);
        let names: Vec<String> = set
            .definitions()
            .iter()
            .map(|d| d.function.name.clone())
            .collect();
        assert_eq!(names, vec!["echo".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }

    #[tokio::test]
    async fn execute_dispatches_by_name() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.execute("echo", r#"{"text": "hello"}"#).await;
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn unknown_capability_is_an_error_string() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.execute("nope", "{}").await;
        assert!(result.contains("unknown capability"));
    }

    #[tokio::test]
    async fn schema_violation_reported_before_execution() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.execute("echo", r#"{"text": 42}"#).await;
        assert!(result.contains("argument validation failed"));
    }

    #[tokio::test]
    async fn long_results_truncated() {
        struct BigTool;
        impl Tool for BigTool {
            fn definition(&self) -> ToolDef {
                ToolDef::new(
                    "big",
                    "Returns a big result",
                    serde_json::json!({"type": "object", "properties": {}}),
                )
            }
            fn execute(&self, _arguments: &str) -> ToolFuture<'_> {
                Box::pin(async { "a".repeat(200) })
            }
        }

        let set = ToolSet::new().with_max_result_bytes(50).with(BigTool);
        let result = set.execute("big", "{}").await;
        assert!(result.contains("[truncated: 200 bytes total]"));
    }

    #[test]
    fn truncate_short_unchanged() {
        assert_eq!(truncate_result("hello".into(), 100), "hello");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(100);
        let result = truncate_result(s, 33);
        assert!(result.contains("[truncated: 200 bytes total]"));
    }

    #[test]
    fn parse_tool_args_reports_schema_hint() {
        #[derive(serde::Deserialize, Debug)]
        struct Args {
            #[allow(dead_code)]
            text: String,
        }
        let err = parse_tool_args::<Args>("not json").unwrap_err();
        assert!(err.starts_with("Error: invalid arguments"));
    }
}
