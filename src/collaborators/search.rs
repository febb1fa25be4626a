//! Search provider implementations.
//!
//! [`DaedraSearchProvider`] uses the daedra crate (DuckDuckGo backend) for
//! real searches. [`FixtureSearchProvider`] serves a fixed hit list for
//! offline development and demos, mirroring the role of a mocked search
//! API key.

use async_trait::async_trait;

use super::{SearchHit, SearchProvider};
use crate::types::{AppError, Result};

/// Web search powered by daedra.
pub struct DaedraSearchProvider {
    num_results: usize,
}

impl DaedraSearchProvider {
    /// Create a provider that requests up to `num_results` hits.
    pub fn new(num_results: usize) -> Self {
        Self { num_results }
    }
}

impl Default for DaedraSearchProvider {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl SearchProvider for DaedraSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: self.num_results,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&search_args).await {
            Ok(response) => Ok(response
                .data
                .iter()
                .map(|r| SearchHit {
                    title: Some(r.title.clone()),
                    url: Some(r.url.clone()),
                })
                .collect()),
            Err(e) => Err(AppError::Search(format!("Search failed: {}", e))),
        }
    }
}

/// Fixed-response provider for offline development.
pub struct FixtureSearchProvider {
    hits: Vec<SearchHit>,
}

impl FixtureSearchProvider {
    /// Serve the given hits for every query.
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

impl Default for FixtureSearchProvider {
    fn default() -> Self {
        Self::new(vec![SearchHit {
            title: Some("Sample Paper".to_string()),
            url: Some("https://example.org/sample-paper".to_string()),
        }])
    }
}

#[async_trait]
impl SearchProvider for FixtureSearchProvider {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
        Ok(self.hits.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_provider_returns_configured_hits() {
        let provider = FixtureSearchProvider::new(vec![
            SearchHit {
                title: Some("A".to_string()),
                url: Some("https://a".to_string()),
            },
            SearchHit {
                title: None,
                url: None,
            },
        ]);

        let hits = provider.search("anything").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url.as_deref(), Some("https://a"));
        assert!(hits[1].url.is_none());
    }
}
