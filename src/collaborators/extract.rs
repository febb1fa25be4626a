//! Page-text extraction via daedra's fetch tool.

use async_trait::async_trait;

use super::TextExtractor;

/// Fetches a page and returns its readable text content.
///
/// Anything that fails to fetch, or yields no content, is reported as
/// `None` so the worker skips the hit without failing the task. PDF and
/// other binary hits fall into the same bucket.
pub struct PageTextExtractor;

impl PageTextExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        Self
    }
}

impl Default for PageTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PageTextExtractor {
    async fn extract(&self, url: &str) -> Option<String> {
        let fetch_args = daedra::VisitPageArgs {
            url: url.to_string(),
            include_images: false,
            selector: None,
        };

        match daedra::tools::fetch::fetch_page(&fetch_args).await {
            Ok(page_content) if !page_content.content.trim().is_empty() => {
                Some(page_content.content)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(url, error = %e, "page fetch failed, skipping hit");
                None
            }
        }
    }
}

/// Extractor that serves canned text per URL; useful for demos and tests.
#[derive(Default)]
pub struct FixtureTextExtractor {
    pages: std::collections::HashMap<String, String>,
}

impl FixtureTextExtractor {
    /// Build from `(url, text)` pairs. URLs not in the map extract nothing.
    pub fn new<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            pages: pages.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TextExtractor for FixtureTextExtractor {
    async fn extract(&self, url: &str) -> Option<String> {
        self.pages.get(url).filter(|t| !t.is_empty()).cloned()
    }
}
