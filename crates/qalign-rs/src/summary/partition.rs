//! Order-preserving batch partitioning under a size budget.

use crate::size::SizeEstimate;

/// Group `summaries` into consecutive batches whose combined size stays
/// within `budget`.
///
/// Greedy left-to-right scan: a batch is closed as soon as the next summary
/// would push it over budget. Every summary lands in exactly one batch, in
/// input order. A summary that is oversized on its own still forms its own
/// one-element batch; finished summaries are never split.
pub fn partition_by_budget(
    summaries: Vec<String>,
    budget: usize,
    sizer: &dyn SizeEstimate,
) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_size = 0usize;

    for summary in summaries {
        let size = sizer.size(&summary);
        if !current.is_empty() && current_size + size > budget {
            batches.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(summary);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::{SizeEstimate, WordCount};

    fn words(n: usize) -> String {
        vec!["w"; n].join(" ")
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(partition_by_budget(vec![], 100, &WordCount).is_empty());
    }

    #[test]
    fn forty_forty_forty_under_hundred() {
        let summaries = vec![words(40), words(40), words(40)];
        let batches = partition_by_budget(summaries, 100, &WordCount);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn partition_is_total_and_ordered() {
        let summaries: Vec<String> = (0..17).map(|i| words(i % 7 + 1)).collect();
        let batches = partition_by_budget(summaries.clone(), 10, &WordCount);

        let flattened: Vec<String> = batches.iter().flatten().cloned().collect();
        assert_eq!(flattened, summaries);
    }

    #[test]
    fn batches_respect_budget_unless_singleton() {
        let summaries = vec![words(3), words(90), words(3), words(3)];
        let budget = 10;
        let batches = partition_by_budget(summaries, budget, &WordCount);
        for batch in &batches {
            let total: usize = batch.iter().map(|s| WordCount.size(s)).sum();
            assert!(
                total <= budget || batch.len() == 1,
                "multi-element batch over budget: {batch:?}"
            );
        }
    }

    #[test]
    fn oversized_summary_forms_own_batch() {
        let summaries = vec![words(5), words(200), words(5)];
        let batches = partition_by_budget(summaries, 10, &WordCount);
        assert_eq!(batches.len(), 3);
        assert_eq!(WordCount.size(&batches[1][0]), 200);
    }
}
