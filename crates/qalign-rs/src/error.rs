//! Typed failure taxonomy for the alignment pipeline.
//!
//! Every failure bubbles to the caller; nothing is swallowed. The three
//! variants map to the three places a run can die: reading configuration at
//! startup, fetching entity data, and calling the chat deployment. The
//! summarization controller never catches or retries; transient-error
//! retry lives in [`AzureChatClient`](crate::AzureChatClient) itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignError {
    /// Required configuration is missing or invalid. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The entity-data endpoint returned a non-success response. Fatal,
    /// never retried.
    #[error("entity fetch failed: {0}")]
    Fetch(String),

    /// A chat-completion call failed after the client's retry budget was
    /// exhausted, or the response could not be used.
    #[error("chat completion failed: {0}")]
    Generation(String),
}

impl AlignError {
    /// Whether this error came from the chat collaborator.
    pub fn is_generation(&self) -> bool {
        matches!(self, AlignError::Generation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure_site() {
        let e = AlignError::Config("AZURE_OPENAI_ENDPOINT is not set".into());
        assert!(e.to_string().starts_with("configuration error:"));

        let e = AlignError::Fetch("HTTP 500 from SPARQL endpoint".into());
        assert!(e.to_string().contains("entity fetch failed"));

        let e = AlignError::Generation("HTTP 429: rate limited".into());
        assert!(e.is_generation());
        assert!(e.to_string().contains("chat completion failed"));
    }
}
