//! Wikidata collaborators: SPARQL statement fetch and entity search.
//!
//! Statement fetch posts a fixed SPARQL query to the query service and
//! returns the raw CSV body, one statement per row, which downstream
//! becomes the splitter's input. Entity search hits the action API's
//! `wbsearchentities` endpoint. Both are fatal on non-success; there is no
//! retry on this side of the system.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::AlignConfig;
use crate::error::AlignError;

/// SPARQL query for an entity's property statements with qualifiers and
/// rank, excluding external identifiers, media, and URLs. `{entity}` is
/// replaced with the entity id.
const STATEMENTS_QUERY: &str = r#"
PREFIX wd: <http://www.wikidata.org/entity/>
PREFIX wikibase: <http://wikiba.se/ontology#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX bd: <http://www.bigdata.com/rdf#>

SELECT
?propertyLabel
?statementValueLabel
?qualifierPropertyLabel
?qualifierValueLabel
?statementRankLabel
WHERE {
  wd:{entity} ?propertyPredicate ?statement .
  ?statement ?statementPropertyPredicate ?statementValue .
  ?property wikibase:claim ?propertyPredicate .
  ?property wikibase:statementProperty ?statementPropertyPredicate .
  ?statement wikibase:rank ?statementRank .
  BIND(
        IF(?statementRank = wikibase:NormalRank, "",
            IF(?statementRank = wikibase:PreferredRank, "Preferred statement",
                IF(?statementRank = wikibase:DeprecatedRank, "Deprecated statement", "")
               )
        ) AS ?statementRankLabel
   )
  OPTIONAL {
    ?statement ?qualifierPredicate ?qualifierValue .
    ?qualifierProperty wikibase:qualifier ?qualifierPredicate .
  }
  ?property wikibase:propertyType ?propertyType .
  FILTER(?propertyType != wikibase:ExternalId && ?propertyType != wikibase:CommonsMedia && ?propertyType != wikibase:Url)
  SERVICE wikibase:label { bd:serviceParam wikibase:language "en" . }
}
ORDER BY ?property ?statementValue ?qualifierProperty ?qualifierValue
"#;

/// One entity search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityHit {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<EntityHit>,
}

/// Whether `s` looks like a Wikidata item id (`Q` followed by digits).
pub fn is_entity_id(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('Q') && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }
}

/// Async HTTP client for the Wikidata SPARQL and action APIs.
#[derive(Clone)]
pub struct WikidataClient {
    client: reqwest::Client,
    sparql_endpoint: String,
    action_api: String,
}

impl WikidataClient {
    pub fn new(
        sparql_endpoint: impl Into<String>,
        action_api: impl Into<String>,
    ) -> Result<Self, AlignError> {
        let client = reqwest::Client::builder()
            .user_agent("qalign/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AlignError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            sparql_endpoint: sparql_endpoint.into(),
            action_api: action_api.into(),
        })
    }

    /// Create a client from a validated [`AlignConfig`].
    pub fn from_config(config: &AlignConfig) -> Result<Self, AlignError> {
        Self::new(&config.sparql_endpoint, &config.action_api)
    }

    /// Fetch an entity's property statements as CSV, one statement per row.
    pub async fn entity_statements(&self, entity_id: &str) -> Result<String, AlignError> {
        if !is_entity_id(entity_id) {
            return Err(AlignError::Fetch(format!(
                "not a Wikidata entity id: {entity_id:?}"
            )));
        }

        let query = STATEMENTS_QUERY.replace("{entity}", entity_id);
        debug!("fetching statements for {entity_id}");

        let resp = self
            .client
            .post(&self.sparql_endpoint)
            .header("Accept", "text/csv")
            .header("Content-Type", "application/sparql-query")
            .body(query)
            .send()
            .await
            .map_err(|e| AlignError::Fetch(format!("SPARQL request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AlignError::Fetch(format!("failed to read SPARQL response: {e}")))?;

        if !status.is_success() {
            return Err(AlignError::Fetch(format!(
                "SPARQL endpoint HTTP {status}: {}",
                snippet(&body)
            )));
        }

        debug!("{entity_id}: {} bytes of statements", body.len());
        Ok(body)
    }

    /// Search entities by label via `wbsearchentities`.
    pub async fn search_entities(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<EntityHit>, AlignError> {
        let resp = self
            .client
            .get(&self.action_api)
            .query(&[
                ("action", "wbsearchentities"),
                ("search", query),
                ("language", "en"),
                ("format", "json"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AlignError::Fetch(format!("entity search failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AlignError::Fetch(format!("action API HTTP {status}")));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| AlignError::Fetch(format!("failed to parse search response: {e}")))?;

        debug!("search {query:?}: {} hit(s)", parsed.search.len());
        Ok(parsed.search)
    }
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    body.get(..end).unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_validation() {
        assert!(is_entity_id("Q42"));
        assert!(is_entity_id("Q1"));
        assert!(!is_entity_id("q42"));
        assert!(!is_entity_id("Q"));
        assert!(!is_entity_id("Q42x"));
        assert!(!is_entity_id("P31"));
        assert!(!is_entity_id(""));
    }

    #[test]
    fn query_template_embeds_entity() {
        let query = STATEMENTS_QUERY.replace("{entity}", "Q42");
        assert!(query.contains("wd:Q42 ?propertyPredicate ?statement"));
        assert!(!query.contains("{entity}"));
        // External ids, media, and URLs stay excluded.
        assert!(query.contains("wikibase:ExternalId"));
        assert!(query.contains("wikibase:CommonsMedia"));
        assert!(query.contains("wikibase:Url"));
    }

    #[tokio::test]
    async fn invalid_id_rejected_before_any_request() {
        let client = WikidataClient::new("https://example.invalid/sparql", "https://example.invalid/api").unwrap();
        let err = client.entity_statements("not-an-id").await.unwrap_err();
        assert!(matches!(err, AlignError::Fetch(_)));
        assert!(err.to_string().contains("not a Wikidata entity id"));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        let cut = snippet(&body);
        assert_eq!(cut.chars().count(), 200);
    }
}
