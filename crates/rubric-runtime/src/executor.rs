//! Engine execution.
//!
//! Builds the engine-native single-record dataset from a request and runs
//! the engine over it. Any engine-level error is a full-batch failure the
//! adapter converts to uniform neutral scores; this module never degrades
//! per-metric on its own.

use rubric_core::types::EvaluationRequest;

use crate::binding::MetricBinding;
use crate::engine::{EngineError, EngineScores, EvalRecord, EvaluationEngine};

/// Placeholder passage handed to the engine when the caller supplied no
/// context; the engine must always receive a non-empty context value.
pub(crate) const DEFAULT_CONTEXT: &str = "No specific context provided";

/// Build the single-record dataset for a request.
///
/// Ground truth mirrors the answer so similarity metrics have a reference.
pub(crate) fn build_record(request: &EvaluationRequest) -> EvalRecord {
    let contexts = match request.context() {
        Some(context) => {
            tracing::info!(
                source = request.context_source().unwrap_or("unspecified"),
                length = context.len(),
                "using caller-supplied evaluation context"
            );
            vec![context.to_string()]
        }
        None => {
            tracing::info!("no context provided, using placeholder");
            vec![DEFAULT_CONTEXT.to_string()]
        }
    };

    EvalRecord {
        question: request.input_text.clone(),
        answer: request.output_text.clone(),
        contexts,
        ground_truth: request.output_text.clone(),
    }
}

/// Run the engine over the request's single-record dataset.
pub(crate) async fn run(
    engine: &dyn EvaluationEngine,
    request: &EvaluationRequest,
    bindings: &[MetricBinding],
) -> Result<EngineScores, EngineError> {
    let record = build_record(request);

    tracing::info!(
        engine = engine.name(),
        bound_metrics = bindings.len(),
        "running engine evaluation"
    );

    engine.evaluate(&record, bindings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubric_core::params;

    #[test]
    fn test_record_mirrors_request() {
        let request = EvaluationRequest::new(
            "What is the capital of France?",
            "Paris is the capital of France.",
            vec!["relevance".to_string()],
        );

        let record = build_record(&request);
        assert_eq!(record.question, request.input_text);
        assert_eq!(record.answer, request.output_text);
        assert_eq!(record.ground_truth, request.output_text);
    }

    #[test]
    fn test_placeholder_context_when_absent() {
        let request = EvaluationRequest::new("q", "a", vec![]);
        let record = build_record(&request);

        assert_eq!(record.contexts, vec![DEFAULT_CONTEXT.to_string()]);
        assert!(!record.context_passage().is_empty());
    }

    #[test]
    fn test_caller_context_used_when_present() {
        let request = EvaluationRequest::new("q", "a", vec![])
            .with_param(params::CONTEXT, "Paris has been the capital since 987.");

        let record = build_record(&request);
        assert_eq!(record.contexts.len(), 1);
        assert_eq!(record.contexts[0], "Paris has been the capital since 987.");
    }

    #[test]
    fn test_empty_context_param_falls_back_to_placeholder() {
        let request = EvaluationRequest::new("q", "a", vec![]).with_param(params::CONTEXT, "");
        let record = build_record(&request);
        assert_eq!(record.context_passage(), DEFAULT_CONTEXT);
    }
}
