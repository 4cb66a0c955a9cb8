//! Fixed metric vocabulary.
//!
//! Maps caller-facing metric names onto the evaluation engine's metric
//! identities, and tags each with the capabilities it needs. The table is
//! static: capability requirements are declared here once, never discovered
//! from a metric instance at run time.
//!
//! Names without an engine counterpart (`toxicity`, unknown names) map to
//! nothing here; they still receive a result through the fallback path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine-native metric identity.
///
/// The wire name from [`as_str`](EngineMetric::as_str) is the key under
/// which the engine reports this metric's raw score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EngineMetric {
    AnswerRelevancy,
    AnswerCorrectness,
    AnswerSimilarity,
    Faithfulness,
}

impl EngineMetric {
    /// Stable wire name used in raw engine results.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMetric::AnswerRelevancy => "answer_relevancy",
            EngineMetric::AnswerCorrectness => "answer_correctness",
            EngineMetric::AnswerSimilarity => "answer_similarity",
            EngineMetric::Faithfulness => "faithfulness",
        }
    }
}

impl fmt::Display for EngineMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine counterpart and capability requirements for one caller metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// The engine metric this caller name maps to.
    pub engine_metric: EngineMetric,

    /// Whether the bound metric needs a chat/completion handle.
    pub needs_llm: bool,

    /// Whether the bound metric needs an embedding handle.
    pub needs_embeddings: bool,
}

const RELEVANCY: MetricSpec = MetricSpec {
    engine_metric: EngineMetric::AnswerRelevancy,
    needs_llm: true,
    needs_embeddings: true,
};

const CORRECTNESS: MetricSpec = MetricSpec {
    engine_metric: EngineMetric::AnswerCorrectness,
    needs_llm: true,
    needs_embeddings: true,
};

const SIMILARITY: MetricSpec = MetricSpec {
    engine_metric: EngineMetric::AnswerSimilarity,
    needs_llm: true,
    needs_embeddings: true,
};

const FAITHFULNESS: MetricSpec = MetricSpec {
    engine_metric: EngineMetric::Faithfulness,
    needs_llm: true,
    needs_embeddings: false,
};

/// Look up the engine counterpart for a caller metric name.
///
/// `helpfulness` and `clarity` have no engine metric of their own; the
/// engine's relevancy and similarity stand in for them.
pub fn lookup(metric: &str) -> Option<MetricSpec> {
    match metric {
        "relevance" => Some(RELEVANCY),
        "correctness" => Some(CORRECTNESS),
        "similarity" => Some(SIMILARITY),
        "faithfulness" => Some(FAITHFULNESS),
        "helpfulness" => Some(RELEVANCY),
        "clarity" => Some(SIMILARITY),
        _ => None,
    }
}

/// The designated default when a request maps to no engine metric at all.
///
/// The engine always receives at least one metric to execute; this is it.
pub fn default_spec() -> MetricSpec {
    RELEVANCY
}

/// Caller name paired with [`default_spec`] for substituted bindings.
pub const DEFAULT_METRIC_NAME: &str = "relevance";

/// Caller metric names with an engine counterpart, in catalog order.
pub fn supported_metrics() -> &'static [&'static str] {
    &[
        "relevance",
        "correctness",
        "similarity",
        "faithfulness",
        "helpfulness",
        "clarity",
    ]
}
