//! Instruction templates for the map and reduce calls.
//!
//! Both instructions are fixed; only the user content varies. The map
//! instruction is allowed to return empty text, since an input slice may
//! carry nothing useful for alignment; an empty leaf summary is dropped by
//! the pipeline rather than fed onward.

/// Map instruction: summarize one slice of entity statements.
pub const MAP_PROMPT: &str = "\
Write a summary for a text input. The input is a subset of statements about \
a knowledge base entity, one statement per line. A statement starts with its \
predicate, followed by the object, then metadata about the statement.

Use only the statements that are relevant for aligning this entity with \
other knowledge bases. If there is no such statement, return empty text. \
Otherwise write a concise, factual summary; every statement in the summary \
must be backed by the input.";

/// Reduce instruction: collapse a batch of summaries into one.
pub const REDUCE_PROMPT: &str = "\
The input is a set of summaries, all about the same knowledge base entity. \
Distill them into a single consolidated summary, optimized for knowledge \
base alignment. Do not add statements or claims that are not present in the \
input.";
