//! Convenience re-exports for the common `qalign-rs` types.
//!
//! ```ignore
//! use qalign_rs::prelude::*;
//! ```

pub use crate::{AzureChatClient, ChatRequest, Message, ToolDef, json_schema_for};

pub use crate::agent::{AskAgent, AskConfig};
pub use crate::config::AlignConfig;
pub use crate::error::AlignError;
pub use crate::retry::RetryConfig;
pub use crate::size::{CharRatio, SizeEstimate, WordCount};
pub use crate::summary::{ChatSummarizer, PipelineConfig, Summarize, SummaryPipeline};
pub use crate::tools::core::{Tool, ToolFuture, ToolSet};
pub use crate::tools::wikidata::wikidata_tool_set;
pub use crate::wikidata::WikidataClient;
