//! The map-reduce convergence controller.
//!
//! One run: split the input to budget-sized units, summarize every unit in
//! parallel (map), then repeatedly partition the summaries into batches and
//! collapse each batch in parallel (reduce) until everything fits the
//! budget in a single final reduce call.
//!
//! Each fan-out is a scatter/gather barrier: all calls in a round are
//! issued together and joined before the controller moves on, and the
//! first failure in a round fails the whole run. No per-unit retry or
//! checkpointing happens here; transient-error handling belongs to the
//! collaborator behind [`Summarize`].

use std::future::Future;
use std::pin::Pin;

use futures::future::join_all;
use tracing::{debug, info};

use crate::error::AlignError;
use crate::size::SizeEstimate;
use crate::summary::partition::partition_by_budget;
use crate::summary::splitter::split_to_budget;

/// Boxed future returned by [`Summarize`] methods.
///
/// Type alias to keep the trait dyn-compatible.
pub type SummaryFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AlignError>> + Send + 'a>>;

/// The text-generation collaborator seam.
///
/// The pipeline only ever needs two operations: summarize one source unit
/// (the map instruction) and collapse a batch of summaries into one (the
/// reduce instruction). Tests plug in scripted implementations; production
/// uses [`ChatSummarizer`](crate::summary::ChatSummarizer).
pub trait Summarize: Send + Sync {
    /// Summarize one source unit.
    fn map(&self, unit: &str) -> SummaryFuture<'_>;

    /// Collapse a batch of summaries, in order, into one summary.
    fn reduce(&self, summaries: &[String]) -> SummaryFuture<'_>;
}

/// Controller limits.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum Size a single call's input may have (the Budget).
    pub token_max: usize,
    /// Maximum partition+collapse rounds before giving up on a
    /// collaborator that refuses to compress.
    pub max_rounds: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            token_max: crate::config::DEFAULT_TOKEN_MAX,
            max_rounds: 12,
        }
    }
}

/// Hierarchical summarizer: split → map → collapse-until-fits → final reduce.
pub struct SummaryPipeline<'a> {
    summarizer: &'a dyn Summarize,
    sizer: &'a dyn SizeEstimate,
    config: PipelineConfig,
}

impl<'a> SummaryPipeline<'a> {
    pub fn new(summarizer: &'a dyn Summarize, sizer: &'a dyn SizeEstimate) -> Self {
        Self {
            summarizer,
            sizer,
            config: PipelineConfig::default(),
        }
    }

    /// Override the token budget (builder pattern).
    pub fn with_token_max(mut self, token_max: usize) -> Self {
        self.config.token_max = token_max;
        self
    }

    /// Replace the whole config (builder pattern).
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full pipeline over raw statement text.
    ///
    /// Empty or whitespace-only input short-circuits to an empty summary
    /// with zero collaborator calls, as does an input whose every leaf
    /// summary comes back empty (nothing alignment-relevant anywhere).
    pub async fn run(&self, text: &str) -> Result<String, AlignError> {
        let budget = self.config.token_max;

        let units: Vec<String> = split_to_budget(text, budget, self.sizer)
            .into_iter()
            .filter(|u| !u.trim().is_empty())
            .collect();
        if units.is_empty() {
            debug!("empty input, skipping summarization entirely");
            return Ok(String::new());
        }

        info!("mapping {} unit(s) under budget {}", units.len(), budget);
        let leaf_results = join_all(units.iter().map(|u| self.summarizer.map(u))).await;
        let mut working: Vec<String> = leaf_results
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();

        if working.is_empty() {
            debug!("no alignment-relevant statements in any unit");
            return Ok(String::new());
        }

        let mut round = 0u32;
        loop {
            let total = self.sizer.total(&working);
            if total <= budget {
                debug!(
                    "working set fits budget ({total} <= {budget}) after {round} round(s), \
                     final reduce over {} summaries",
                    working.len()
                );
                return self.summarizer.reduce(&working).await;
            }

            if round >= self.config.max_rounds {
                return Err(AlignError::Generation(format!(
                    "summaries still exceed the token budget ({total} > {budget}) \
                     after {round} collapse rounds"
                )));
            }
            round += 1;

            let batches = partition_by_budget(std::mem::take(&mut working), budget, self.sizer);
            info!(
                "collapse round {round}: {} batch(es), {total} tokens over budget {budget}",
                batches.len()
            );
            let collapsed = join_all(batches.iter().map(|b| self.summarizer.reduce(b))).await;
            working = collapsed.into_iter().collect::<Result<Vec<_>, _>>()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::WordCount;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted collaborator: fixed-length replies, call counters, and an
    /// optional map call that fails.
    struct ScriptedSummarizer {
        map_reply: String,
        reduce_reply: String,
        map_calls: AtomicUsize,
        reduce_calls: AtomicUsize,
        fail_map_at: Option<usize>,
    }

    impl ScriptedSummarizer {
        fn new(map_words: usize, reduce_words: usize) -> Self {
            Self {
                map_reply: vec!["m"; map_words].join(" "),
                reduce_reply: vec!["r"; reduce_words].join(" "),
                map_calls: AtomicUsize::new(0),
                reduce_calls: AtomicUsize::new(0),
                fail_map_at: None,
            }
        }

        fn map_count(&self) -> usize {
            self.map_calls.load(Ordering::SeqCst)
        }

        fn reduce_count(&self) -> usize {
            self.reduce_calls.load(Ordering::SeqCst)
        }
    }

    impl Summarize for ScriptedSummarizer {
        fn map(&self, _unit: &str) -> SummaryFuture<'_> {
            let call = self.map_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let reply = self.map_reply.clone();
            let fail = self.fail_map_at == Some(call);
            Box::pin(async move {
                if fail {
                    Err(AlignError::Generation("scripted map failure".into()))
                } else {
                    Ok(reply)
                }
            })
        }

        fn reduce(&self, _summaries: &[String]) -> SummaryFuture<'_> {
            self.reduce_calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.reduce_reply.clone();
            Box::pin(async move { Ok(reply) })
        }
    }

    fn lines(count: usize, words_each: usize) -> String {
        (0..count)
            .map(|_| vec!["w"; words_each].join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn fits_budget_single_final_reduce() {
        // One unit, one leaf summary well under budget: exactly one map
        // call, exactly one reduce call, zero collapse rounds.
        let summarizer = ScriptedSummarizer::new(5, 3);
        let pipeline = SummaryPipeline::new(&summarizer, &WordCount).with_token_max(100);

        let result = pipeline.run(&lines(4, 5)).await.unwrap();
        assert_eq!(result, summarizer.reduce_reply);
        assert_eq!(summarizer.map_count(), 1);
        assert_eq!(summarizer.reduce_count(), 1);
    }

    #[tokio::test]
    async fn collapse_round_then_final_reduce() {
        // 4 units of 60-word leaf summaries against a 100 budget:
        // 240 > 100, and 60+60 > 100, so each summary collapses alone
        // (4 batch reduces), after which 4 x 10 = 40 <= 100 allows the
        // final reduce. 4 map calls, 5 reduce calls, one collapse round.
        let summarizer = ScriptedSummarizer::new(60, 10);
        let pipeline = SummaryPipeline::new(&summarizer, &WordCount).with_token_max(100);

        // ~300 words in 12 lines splits into 4 units of ~75 words.
        let result = pipeline.run(&lines(12, 25)).await.unwrap();
        assert_eq!(result, summarizer.reduce_reply);
        assert_eq!(summarizer.map_count(), 4);
        assert_eq!(summarizer.reduce_count(), 5);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let summarizer = ScriptedSummarizer::new(5, 3);
        let pipeline = SummaryPipeline::new(&summarizer, &WordCount).with_token_max(100);

        for input in ["", "   \n\t  \n"] {
            let result = pipeline.run(input).await.unwrap();
            assert_eq!(result, "");
        }
        assert_eq!(summarizer.map_count(), 0);
        assert_eq!(summarizer.reduce_count(), 0);
    }

    #[tokio::test]
    async fn all_empty_leaf_summaries_yield_empty_summary() {
        // Map finds nothing alignment-relevant anywhere: no reduce call,
        // empty final summary.
        let summarizer = ScriptedSummarizer::new(0, 3);
        let pipeline = SummaryPipeline::new(&summarizer, &WordCount).with_token_max(100);

        let result = pipeline.run(&lines(4, 5)).await.unwrap();
        assert_eq!(result, "");
        assert_eq!(summarizer.map_count(), 1);
        assert_eq!(summarizer.reduce_count(), 0);
    }

    #[tokio::test]
    async fn map_failure_fails_the_run() {
        let mut summarizer = ScriptedSummarizer::new(5, 3);
        summarizer.fail_map_at = Some(2);
        let pipeline = SummaryPipeline::new(&summarizer, &WordCount).with_token_max(10);

        // Forces at least 2 units so the second map call fires.
        let err = pipeline.run(&lines(8, 4)).await.unwrap_err();
        assert!(err.is_generation());
        assert_eq!(summarizer.reduce_count(), 0, "no reduce after a failed round");
    }

    #[tokio::test]
    async fn non_compressing_collaborator_hits_round_limit() {
        // Reduce replies are as big as the map replies, so the working set
        // never shrinks below the budget.
        let summarizer = ScriptedSummarizer::new(60, 60);
        let pipeline = SummaryPipeline::new(&summarizer, &WordCount).with_config(PipelineConfig {
            token_max: 100,
            max_rounds: 3,
        });

        let err = pipeline.run(&lines(12, 25)).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("collapse rounds"), "unexpected error: {msg}");
    }
}
