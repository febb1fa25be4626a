//! Planning agent.
//!
//! Synthesizes concepts from a set of parsed papers: a TF-IDF pass over the
//! stored texts surfaces the overlapping important terms, plus a crude
//! feasibility score and example applications. The result is cached in the
//! store under a TTL — consumers must tolerate the record having expired.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::store::{self, Store, ACTIVITY_CHANNEL};
use crate::types::{ActivityEvent, AppError, Result};

/// How long synthesis records live, regardless of consumption.
pub const SYNTHESIS_TTL: Duration = Duration::from_secs(3600);

/// Characters of each paper text fed into the TF-IDF pass.
const TEXT_WINDOW: usize = 5000;

/// Vocabulary cap for the TF-IDF pass.
const MAX_FEATURES: usize = 1000;

/// Minimal English stop-word list; enough to keep glue words out of the
/// overlap terms.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "has", "have", "had", "this", "that", "with", "from", "they", "them", "were", "been",
    "their", "which", "these", "those", "there", "where", "when", "what", "will", "would",
    "could", "should", "into", "than", "then", "more", "most", "some", "such", "only", "over",
    "also", "each", "between", "both", "during", "under", "about", "after", "before", "while",
    "other", "using", "used", "use", "based", "its",
];

/// A synthesis over a set of papers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    /// Terms with high average TF-IDF across the documents.
    pub overlap: Vec<String>,
    /// Crude 0-10 score: proportion of substantive documents.
    pub feasibility: f64,
    /// Example applications derived from the top terms.
    pub applications: Vec<String>,
}

/// Agent that turns stored paper records into a TTL'd synthesis record.
pub struct PlanningAgent {
    store: Arc<dyn Store>,
}

impl PlanningAgent {
    /// Create a planning agent.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Synthesize concepts from the given papers and cache the result.
    ///
    /// Missing paper records contribute an empty text rather than failing
    /// the synthesis. The record is stored at `synthesis_key` when given,
    /// otherwise at `synthesis:<ids>`, with a fixed TTL.
    pub async fn synthesize(
        &self,
        paper_ids: &[String],
        synthesis_key: Option<&str>,
    ) -> Result<Synthesis> {
        let mut texts = Vec::with_capacity(paper_ids.len());
        for paper_id in paper_ids {
            let record = self
                .store
                .get_all_hash_fields(&store::paper_key(paper_id))
                .await?;
            let text = record.get("text").cloned().unwrap_or_default();
            texts.push(text.chars().take(TEXT_WINDOW).collect::<String>());
        }

        let mut synthesis = Synthesis {
            overlap: Vec::new(),
            feasibility: 0.0,
            applications: Vec::new(),
        };

        if !texts.is_empty() {
            synthesis.overlap = top_overlap_terms(&texts);

            let substantive = texts.iter().filter(|t| t.len() > 1000).count();
            let proportion = substantive as f64 / texts.len() as f64;
            synthesis.feasibility = round2((proportion * 10.0).min(10.0));

            if !synthesis.overlap.is_empty() {
                let leading: Vec<&str> = synthesis
                    .overlap
                    .iter()
                    .take(3)
                    .map(String::as_str)
                    .collect();
                synthesis.applications.push(format!(
                    "Use {} for optimization workflows",
                    leading.join(", ")
                ));
            }
        }

        let result_key = synthesis_key
            .map(str::to_string)
            .unwrap_or_else(|| store::synthesis_key(paper_ids));
        let payload = serde_json::to_string(&synthesis)
            .map_err(|e| AppError::Decode(format!("synthesis encode failed: {e}")))?;
        self.store
            .set_with_ttl(&result_key, &payload, SYNTHESIS_TTL)
            .await?;

        let event =
            ActivityEvent::new("planning", "synthesized").with("key", json!(result_key));
        self.store.publish(ACTIVITY_CHANNEL, &event.to_json()).await?;

        Ok(synthesis)
    }
}

/// Terms with the highest average TF-IDF across documents, capped at 10,
/// thresholded at 0.01 average score.
fn top_overlap_terms(texts: &[String]) -> Vec<String> {
    let doc_tokens: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
    let doc_count = doc_tokens.len();

    // Document frequency, used both for the vocabulary cap and for IDF.
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in &doc_tokens {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for token in unique {
            *document_frequency.entry(token).or_insert(0) += 1;
        }
    }

    let mut vocabulary: Vec<(&str, usize)> = document_frequency
        .iter()
        .map(|(term, df)| (*term, *df))
        .collect();
    vocabulary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    vocabulary.truncate(MAX_FEATURES);
    let vocabulary: HashSet<&str> = vocabulary.into_iter().map(|(term, _)| term).collect();

    // Average TF-IDF per term across all documents.
    let mut average_score: HashMap<&str, f64> = HashMap::new();
    for tokens in &doc_tokens {
        if tokens.is_empty() {
            continue;
        }
        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        for token in tokens {
            if vocabulary.contains(token.as_str()) {
                *term_counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }
        let total = tokens.len() as f64;
        for (term, count) in term_counts {
            let tf = count as f64 / total;
            let df = document_frequency[term] as f64;
            let idf = ((doc_count as f64 + 1.0) / (df + 1.0)).ln() + 1.0;
            *average_score.entry(term).or_insert(0.0) += tf * idf / doc_count as f64;
        }
    }

    let mut ranked: Vec<(&str, f64)> = average_score.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
        .into_iter()
        .take(20)
        .filter(|(_, score)| *score > 0.01)
        .take(10)
        .map(|(term, _)| term.to_string())
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
