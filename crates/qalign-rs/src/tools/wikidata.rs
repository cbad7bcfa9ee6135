//! The Wikidata capabilities offered to the ask agent.
//!
//! Three operations: fetch an entity's raw statements, search entities by
//! label, and build a budgeted alignment summary for an entity. Each wraps
//! a collaborator client; failures come back as `"Error: ..."` strings for
//! the model to react to.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::config::AlignConfig;
use crate::json_schema_for;
use crate::size::WordCount;
use crate::summary::{ChatSummarizer, SummaryPipeline};
use crate::tools::core::{Tool, ToolFuture, ToolSet, parse_tool_args};
use crate::wikidata::WikidataClient;
use crate::{AzureChatClient, ToolDef};

/// Build the capability set for entity questions.
pub fn wikidata_tool_set(
    wikidata: Arc<WikidataClient>,
    chat: Arc<AzureChatClient>,
    config: AlignConfig,
) -> ToolSet {
    ToolSet::new()
        .with(EntityStatements {
            wikidata: wikidata.clone(),
        })
        .with(EntitySearch { wikidata: wikidata.clone() })
        .with(EntitySummary {
            wikidata,
            chat,
            config,
        })
}

// ── entity_statements ──────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct EntityStatementsArgs {
    /// Wikidata entity identifier, e.g. "Q42".
    entity_id: String,
}

/// Fetch an entity's property statements as CSV, one statement per row.
pub struct EntityStatements {
    wikidata: Arc<WikidataClient>,
}

impl Tool for EntityStatements {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "entity_statements",
            "Fetch the property statements of a Wikidata entity as CSV, one \
             statement per row: property label, value label, qualifier \
             property/value labels, and statement rank. Use this to read \
             what Wikidata asserts about an entity.",
            json_schema_for::<EntityStatementsArgs>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: EntityStatementsArgs = match parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            match self.wikidata.entity_statements(&args.entity_id).await {
                Ok(csv) if csv.trim().is_empty() => {
                    format!("No statements found for {}.", args.entity_id)
                }
                Ok(csv) => csv,
                Err(e) => format!("Error: {e}"),
            }
        })
    }
}

// ── entity_search ──────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct EntitySearchArgs {
    /// Label text to search for, e.g. "Hungary".
    query: String,
    /// Maximum number of hits to return (default 5).
    #[serde(default)]
    limit: Option<u32>,
}

/// Search entities by label and return id/label/description lines.
pub struct EntitySearch {
    wikidata: Arc<WikidataClient>,
}

impl Tool for EntitySearch {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "entity_search",
            "Search Wikidata entities by label. Returns one line per hit: \
             the entity id, its label, and a short description. Use this to \
             resolve a name to an entity id before fetching statements.",
            json_schema_for::<EntitySearchArgs>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: EntitySearchArgs = match parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let limit = args.limit.unwrap_or(5).min(50);
            match self.wikidata.search_entities(&args.query, limit).await {
                Ok(hits) if hits.is_empty() => {
                    format!("No entities match {:?}.", args.query)
                }
                Ok(hits) => hits
                    .iter()
                    .map(|h| {
                        format!(
                            "{} — {}: {}",
                            h.id,
                            h.label.as_deref().unwrap_or("(no label)"),
                            h.description.as_deref().unwrap_or("(no description)"),
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => format!("Error: {e}"),
            }
        })
    }
}

// ── entity_summary ─────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct EntitySummaryArgs {
    /// Wikidata entity identifier, e.g. "Q42".
    entity_id: String,
}

/// Fetch an entity's statements and reduce them to one budgeted summary.
pub struct EntitySummary {
    wikidata: Arc<WikidataClient>,
    chat: Arc<AzureChatClient>,
    config: AlignConfig,
}

impl Tool for EntitySummary {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            "entity_summary",
            "Produce a concise alignment-oriented summary of a Wikidata \
             entity from its statements. Slower than entity_statements but \
             returns digested text instead of raw CSV; prefer it for \
             entities with many statements.",
            json_schema_for::<EntitySummaryArgs>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: EntitySummaryArgs = match parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };
            let statements = match self.wikidata.entity_statements(&args.entity_id).await {
                Ok(csv) => csv,
                Err(e) => return format!("Error: {e}"),
            };
            let summarizer = ChatSummarizer::new(&self.chat, &self.config);
            let pipeline = SummaryPipeline::new(&summarizer, &WordCount)
                .with_token_max(self.config.token_max);
            match pipeline.run(&statements).await {
                Ok(summary) if summary.is_empty() => format!(
                    "No alignment-relevant statements found for {}.",
                    args.entity_id
                ),
                Ok(summary) => summary,
                Err(e) => format!("Error: {e}"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_ACTION_API, DEFAULT_SPARQL_ENDPOINT};

    fn test_config() -> AlignConfig {
        AlignConfig {
            endpoint: "https://myres.openai.azure.com".into(),
            deployment: "gpt-4o".into(),
            api_key: "secret".into(),
            api_version: "2024-02-15-preview".into(),
            token_max: 1000,
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.into(),
            action_api: DEFAULT_ACTION_API.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    fn test_tool_set() -> ToolSet {
        let config = test_config();
        let wikidata = Arc::new(WikidataClient::from_config(&config).unwrap());
        let chat = Arc::new(AzureChatClient::from_config(&config).unwrap());
        wikidata_tool_set(wikidata, chat, config)
    }

    #[test]
    fn all_three_capabilities_registered() {
        let tools = test_tool_set();
        let mut names: Vec<String> = tools
            .definitions()
            .iter()
            .map(|d| d.function.name.clone())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["entity_search", "entity_statements", "entity_summary"]
        );
    }

    #[test]
    fn argument_schemas_require_their_inputs() {
        let tools = test_tool_set();
        for def in tools.definitions() {
            let required = def.function.parameters["required"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            assert!(
                !required.is_empty(),
                "{} should require at least one argument",
                def.function.name
            );
        }
    }

    #[tokio::test]
    async fn malformed_id_surfaces_as_error_string() {
        let tools = test_tool_set();
        let result = tools
            .execute("entity_statements", r#"{"entity_id": "banana"}"#)
            .await;
        assert!(result.starts_with("Error:"), "got: {result}");
        assert!(result.contains("entity id"));
    }
}
