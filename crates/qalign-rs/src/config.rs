//! Process configuration, read once at startup and validated eagerly.
//!
//! All external configuration comes in through environment variables and is
//! captured in an [`AlignConfig`] before anything else runs. Components take
//! the config by reference instead of reading the environment ad hoc, so a
//! missing variable fails the run at construction rather than mid-pipeline.

use std::env;

use crate::error::AlignError;

/// API version sent to the Azure OpenAI endpoint when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Token budget for a single summarization call when none is configured.
pub const DEFAULT_TOKEN_MAX: usize = 1000;

/// Public Wikidata SPARQL endpoint.
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// Public Wikidata action API (entity search).
pub const DEFAULT_ACTION_API: &str = "https://www.wikidata.org/w/api.php";

/// Configuration for one run.
///
/// Built from the environment via [`AlignConfig::from_env`], or assembled
/// directly in tests. `token_max` is the Budget: the maximum Size a single
/// text block submitted to one chat call may have.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://myres.openai.azure.com`.
    pub endpoint: String,
    /// Chat-completions deployment name.
    pub deployment: String,
    /// API key (or Entra bearer token) for the deployment.
    pub api_key: String,
    /// API version query parameter.
    pub api_version: String,
    /// Token budget for a single summarization call.
    pub token_max: usize,
    /// SPARQL endpoint for entity statement fetches.
    pub sparql_endpoint: String,
    /// Action API endpoint for entity search.
    pub action_api: String,
    /// Sampling temperature for chat calls.
    pub temperature: f32,
    /// Maximum tokens per chat response.
    pub max_tokens: u32,
}

impl AlignConfig {
    /// Read configuration from the process environment, failing fast on
    /// anything missing or malformed.
    ///
    /// Required: `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_DEPLOYMENT_NAME`,
    /// `AZURE_OPENAI_API_KEY`. Optional: `AZURE_OPENAI_API_VERSION`,
    /// `QALIGN_TOKEN_MAX`, `QALIGN_SPARQL_ENDPOINT`.
    pub fn from_env() -> Result<Self, AlignError> {
        let config = Self {
            endpoint: require("AZURE_OPENAI_ENDPOINT")?,
            deployment: require("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            api_key: require("AZURE_OPENAI_API_KEY")?,
            api_version: env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            token_max: match env::var("QALIGN_TOKEN_MAX") {
                Ok(raw) => raw.parse().map_err(|_| {
                    AlignError::Config(format!("QALIGN_TOKEN_MAX is not a number: {raw:?}"))
                })?,
                Err(_) => DEFAULT_TOKEN_MAX,
            },
            sparql_endpoint: env::var("QALIGN_SPARQL_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SPARQL_ENDPOINT.to_string()),
            action_api: DEFAULT_ACTION_API.to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that hold for every run regardless of where the
    /// values came from.
    pub fn validate(&self) -> Result<(), AlignError> {
        if !self.endpoint.starts_with("http") {
            return Err(AlignError::Config(format!(
                "endpoint is not a URL: {:?}",
                self.endpoint
            )));
        }
        if self.deployment.is_empty() {
            return Err(AlignError::Config("deployment name is empty".into()));
        }
        if self.api_key.is_empty() {
            return Err(AlignError::Config("API key is empty".into()));
        }
        if self.token_max == 0 {
            return Err(AlignError::Config(
                "token budget must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Override the token budget (builder pattern).
    pub fn with_token_max(mut self, token_max: usize) -> Self {
        self.token_max = token_max;
        self
    }

    /// Override the sampling temperature (builder pattern).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

fn require(name: &str) -> Result<String, AlignError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AlignError::Config(format!("{name} is not set"))),
    }
}
