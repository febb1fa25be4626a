//! Analysis agent.
//!
//! Aggregates a set of synthesis records into a feasibility assessment.
//! Synthesis records are TTL'd, so any of them may have expired by the
//! time this runs; misses and unparseable records are simply skipped.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{self, Store, ACTIVITY_CHANNEL};
use crate::types::{ActivityEvent, AppError, Result};

/// How long analysis records live.
pub const ANALYSIS_TTL: Duration = Duration::from_secs(3600);

/// One contributing synthesis, as recorded in the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSource {
    /// Store key of the synthesis record.
    pub key: String,
    /// Overlap terms it reported.
    pub overlap: Vec<String>,
}

/// Aggregated feasibility assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// The synthesis records that were still available.
    pub sources: Vec<AnalysisSource>,
    /// Mean feasibility across available records, 0-10, 2-decimal rounded.
    pub score: f64,
}

/// Agent producing feasibility analyses from cached syntheses.
pub struct AnalysisAgent {
    store: Arc<dyn Store>,
}

impl AnalysisAgent {
    /// Create an analysis agent.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Aggregate the given synthesis records and cache the assessment
    /// under `analysis:<unix-ts>` with a fixed TTL.
    pub async fn assess_feasibility(&self, synthesis_keys: &[String]) -> Result<Analysis> {
        let mut analysis = Analysis {
            sources: Vec::new(),
            score: 0.0,
        };
        let mut scores = Vec::new();

        for key in synthesis_keys {
            let Some(raw) = self.store.get(key).await? else {
                // Expired or never written; consumers tolerate the miss.
                continue;
            };
            let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) else {
                tracing::warn!(key, "skipping unparseable synthesis record");
                continue;
            };

            let overlap = data
                .get("overlap")
                .and_then(|v| v.as_array())
                .map(|terms| {
                    terms
                        .iter()
                        .filter_map(|t| t.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            analysis.sources.push(AnalysisSource {
                key: key.clone(),
                overlap,
            });
            scores.push(data.get("feasibility").and_then(|v| v.as_f64()).unwrap_or(0.0));
        }

        if !scores.is_empty() {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            analysis.score = (mean * 100.0).round() / 100.0;
        }

        let analysis_key = store::analysis_key(chrono::Utc::now().timestamp());
        let payload = serde_json::to_string(&analysis)
            .map_err(|e| AppError::Decode(format!("analysis encode failed: {e}")))?;
        self.store
            .set_with_ttl(&analysis_key, &payload, ANALYSIS_TTL)
            .await?;

        let event =
            ActivityEvent::new("analysis", "completed").with("key", json!(analysis_key));
        self.store.publish(ACTIVITY_CHANNEL, &event.to_json()).await?;

        Ok(analysis)
    }
}
