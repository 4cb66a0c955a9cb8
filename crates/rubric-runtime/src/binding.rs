//! Metric binding.
//!
//! Translates the caller's metric names into bound engine metrics: each
//! requested name is looked up in the fixed catalog, attached to the chat
//! handle unconditionally and to the embedding handle only when the
//! catalog says it is needed and one is available, and given a fresh run
//! configuration.
//!
//! Bindings hold bound capability state and are not safely reusable across
//! calls; they are created fresh per evaluation call and dropped at call
//! end.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rubric_core::catalog::{self, EngineMetric, MetricSpec, DEFAULT_METRIC_NAME};

use crate::capability::{ChatModel, EmbeddingModel};

/// Per-metric run configuration, initialized fresh for every binding.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Ceiling on one judge call for this metric.
    pub timeout: Duration,

    /// Additional attempts after a failed judge call.
    pub max_retries: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 1,
        }
    }
}

/// A caller metric bound to its engine counterpart and capabilities,
/// ready for execution.
pub struct MetricBinding {
    /// Caller-facing metric name.
    pub metric: String,

    /// Engine-native counterpart.
    pub engine_metric: EngineMetric,

    /// Whether the catalog declares an embeddings requirement.
    pub needs_embeddings: bool,

    /// Chat handle, attached unconditionally.
    pub llm: Arc<dyn ChatModel>,

    /// Embedding handle; present only when required and available.
    pub embeddings: Option<Arc<dyn EmbeddingModel>>,

    /// Fresh run configuration for this binding.
    pub run_config: RunConfig,
}

impl fmt::Debug for MetricBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricBinding")
            .field("metric", &self.metric)
            .field("engine_metric", &self.engine_metric)
            .field("llm", &self.llm.name())
            .field("embeddings", &self.embeddings.is_some())
            .finish()
    }
}

/// Bind the requested metrics to the detected capabilities.
///
/// Names without an engine counterpart are silently dropped from execution
/// (they are still guaranteed a result later, through the fallback path).
/// If nothing survives, one default binding is substituted so the engine
/// always receives at least one metric to execute.
pub fn bind(
    metrics: &[String],
    llm: &Arc<dyn ChatModel>,
    embeddings: Option<&Arc<dyn EmbeddingModel>>,
) -> Vec<MetricBinding> {
    let mut bindings = Vec::new();

    for metric in metrics {
        let Some(spec) = catalog::lookup(metric) else {
            tracing::debug!(metric = %metric, "no engine counterpart, deferring to fallback path");
            continue;
        };
        bindings.push(make_binding(metric.clone(), spec, llm, embeddings));
    }

    if bindings.is_empty() {
        tracing::warn!("no engine-supported metrics requested, substituting default");
        bindings.push(make_binding(
            DEFAULT_METRIC_NAME.to_string(),
            catalog::default_spec(),
            llm,
            embeddings,
        ));
    }

    bindings
}

fn make_binding(
    metric: String,
    spec: MetricSpec,
    llm: &Arc<dyn ChatModel>,
    embeddings: Option<&Arc<dyn EmbeddingModel>>,
) -> MetricBinding {
    let attached = if spec.needs_embeddings {
        match embeddings {
            Some(handle) => Some(Arc::clone(handle)),
            None => {
                // Non-fatal: the engine may still produce a usable score,
                // or an invalid one handled at normalization time.
                tracing::warn!(metric = %metric, "metric needs embeddings but none available");
                None
            }
        }
    } else {
        None
    };

    MetricBinding {
        metric,
        engine_metric: spec.engine_metric,
        needs_embeddings: spec.needs_embeddings,
        llm: Arc::clone(llm),
        embeddings: attached,
        run_config: RunConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use async_trait::async_trait;

    struct MockChat;

    #[async_trait]
    impl ChatModel for MockChat {
        async fn complete(&self, _prompt: &str) -> Result<String, CapabilityError> {
            Ok("{\"score\": 1.0}".to_string())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct MockEmbeddings;

    #[async_trait]
    impl EmbeddingModel for MockEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>, CapabilityError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn chat() -> Arc<dyn ChatModel> {
        Arc::new(MockChat)
    }

    fn embeddings() -> Arc<dyn EmbeddingModel> {
        Arc::new(MockEmbeddings)
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_known_metrics_bound_in_order() {
        let llm = chat();
        let bindings = bind(&names(&["relevance", "faithfulness"]), &llm, None);

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].metric, "relevance");
        assert_eq!(bindings[0].engine_metric, EngineMetric::AnswerRelevancy);
        assert_eq!(bindings[1].engine_metric, EngineMetric::Faithfulness);
    }

    #[test]
    fn test_unknown_metrics_dropped() {
        let llm = chat();
        let bindings = bind(&names(&["toxicity", "relevance", "banana"]), &llm, None);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].metric, "relevance");
    }

    #[test]
    fn test_empty_result_substitutes_default() {
        let llm = chat();
        let bindings = bind(&names(&["toxicity", "banana"]), &llm, None);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].metric, DEFAULT_METRIC_NAME);
        assert_eq!(bindings[0].engine_metric, EngineMetric::AnswerRelevancy);
    }

    #[test]
    fn test_embeddings_attached_when_required_and_available() {
        let llm = chat();
        let handle = embeddings();
        let bindings = bind(&names(&["similarity", "faithfulness"]), &llm, Some(&handle));

        // similarity needs embeddings; faithfulness does not.
        assert!(bindings[0].embeddings.is_some());
        assert!(bindings[1].embeddings.is_none());
    }

    #[test]
    fn test_missing_embeddings_is_non_fatal() {
        let llm = chat();
        let bindings = bind(&names(&["similarity"]), &llm, None);

        assert_eq!(bindings.len(), 1);
        assert!(bindings[0].needs_embeddings);
        assert!(bindings[0].embeddings.is_none());
    }

    #[test]
    fn test_fresh_run_config_per_binding() {
        let llm = chat();
        let bindings = bind(&names(&["relevance"]), &llm, None);
        assert_eq!(bindings[0].run_config.timeout, Duration::from_secs(60));
        assert_eq!(bindings[0].run_config.max_retries, 1);
    }
}
