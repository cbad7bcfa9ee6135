//! Capability layer: named operations the ask agent can discover and invoke.
//!
//! [`core`] holds the framework-independent contract: a [`Tool`](core::Tool)
//! announces its name, description, and argument schema, and a
//! [`ToolSet`](core::ToolSet) lists and dispatches capabilities by name.
//! [`wikidata`] holds the concrete Wikidata capabilities.

pub mod core;
pub mod wikidata;

pub use self::core::{Tool, ToolFuture, ToolSet, parse_tool_args, truncate_result};
pub use self::wikidata::wikidata_tool_set;
