//! Hierarchical map-reduce summarization under a token budget.
//!
//! The pieces, leaves first:
//!
//! - [`splitter`] — divide oversized statement text into budget-sized units
//!   at line breaks near the midpoint, content- and order-preserving.
//! - [`partition`] — group summaries into consecutive batches that fit the
//!   budget.
//! - [`pipeline`] — the convergence controller: map every unit to a leaf
//!   summary in parallel, then collapse batches of summaries round by round
//!   until the working set fits the budget, and reduce once more for the
//!   final answer.
//! - [`chat`] — the [`Summarize`](pipeline::Summarize) implementation backed
//!   by an [`AzureChatClient`](crate::AzureChatClient).

pub mod chat;
pub mod partition;
pub mod pipeline;
pub mod prompts;
pub mod splitter;

pub use chat::ChatSummarizer;
pub use partition::partition_by_budget;
pub use pipeline::{PipelineConfig, Summarize, SummaryFuture, SummaryPipeline};
pub use splitter::split_to_budget;
