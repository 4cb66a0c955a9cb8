//! Result normalization.
//!
//! Maps raw engine results back onto the caller's metric names through the
//! same catalog that produced the bindings, reverse direction. Per-metric
//! degradation is handled here: a missing key gets the missing sentinel, a
//! non-numeric value gets the degenerate sentinel, everything else passes
//! through unclamped.

use rubric_core::catalog;
use rubric_core::report::{Score, ScoreReport, ScoreSource};
use rubric_core::{DEGENERATE_SCORE, MISSING_SCORE};

use crate::engine::EngineScores;

/// Map raw engine results onto the requested metric names.
///
/// Every requested name appears in the returned report exactly once.
pub(crate) fn normalize(raw: &EngineScores, metrics: &[String]) -> ScoreReport {
    let mut report = ScoreReport::new();

    for metric in metrics {
        let value = catalog::lookup(metric).and_then(|spec| raw.get(&spec.engine_metric).copied());

        let score = match value {
            Some(value) if value.is_nan() => {
                tracing::warn!(metric = %metric, "engine returned NaN, applying degenerate sentinel");
                Score::new(DEGENERATE_SCORE, ScoreSource::Degenerate)
            }
            Some(value) => Score::engine(value),
            None => {
                tracing::warn!(metric = %metric, "no engine result for metric");
                Score::new(MISSING_SCORE, ScoreSource::Missing)
            }
        };

        report.insert(metric.clone(), score);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubric_core::EngineMetric;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_values_pass_through() {
        let mut raw = EngineScores::new();
        raw.insert(EngineMetric::AnswerRelevancy, 0.91);
        raw.insert(EngineMetric::Faithfulness, 0.78);

        let report = normalize(&raw, &names(&["relevance", "faithfulness"]));

        assert_eq!(report.get("relevance").unwrap().value, 0.91);
        assert_eq!(report.get("relevance").unwrap().source, ScoreSource::Engine);
        assert_eq!(report.get("faithfulness").unwrap().value, 0.78);
    }

    #[test]
    fn test_nan_gets_degenerate_sentinel_siblings_untouched() {
        let mut raw = EngineScores::new();
        raw.insert(EngineMetric::AnswerRelevancy, f64::NAN);
        raw.insert(EngineMetric::Faithfulness, 0.8);

        let report = normalize(&raw, &names(&["relevance", "faithfulness"]));

        let relevance = report.get("relevance").unwrap();
        assert_eq!(relevance.value, DEGENERATE_SCORE);
        assert_eq!(relevance.source, ScoreSource::Degenerate);

        let faithfulness = report.get("faithfulness").unwrap();
        assert_eq!(faithfulness.value, 0.8);
        assert_eq!(faithfulness.source, ScoreSource::Engine);
    }

    #[test]
    fn test_missing_key_gets_missing_sentinel() {
        let raw = EngineScores::new();
        let report = normalize(&raw, &names(&["relevance"]));

        let relevance = report.get("relevance").unwrap();
        assert_eq!(relevance.value, MISSING_SCORE);
        assert_eq!(relevance.source, ScoreSource::Missing);
    }

    #[test]
    fn test_uncatalogued_names_score_missing() {
        let mut raw = EngineScores::new();
        raw.insert(EngineMetric::AnswerRelevancy, 0.9);

        let report = normalize(&raw, &names(&["toxicity", "banana"]));

        assert_eq!(report.get("toxicity").unwrap().value, MISSING_SCORE);
        assert_eq!(report.get("banana").unwrap().source, ScoreSource::Missing);
    }

    #[test]
    fn test_proxy_metrics_read_their_engine_key() {
        let mut raw = EngineScores::new();
        raw.insert(EngineMetric::AnswerRelevancy, 0.66);
        raw.insert(EngineMetric::AnswerSimilarity, 0.42);

        let report = normalize(&raw, &names(&["helpfulness", "clarity"]));

        assert_eq!(report.get("helpfulness").unwrap().value, 0.66);
        assert_eq!(report.get("clarity").unwrap().value, 0.42);
    }

    #[test]
    fn test_out_of_range_values_unclamped() {
        let mut raw = EngineScores::new();
        raw.insert(EngineMetric::AnswerRelevancy, 1.08);

        let report = normalize(&raw, &names(&["relevance"]));
        assert_eq!(report.get("relevance").unwrap().value, 1.08);
    }

    #[test]
    fn test_key_set_matches_request_exactly() {
        let mut raw = EngineScores::new();
        raw.insert(EngineMetric::AnswerRelevancy, 0.5);
        raw.insert(EngineMetric::Faithfulness, 0.5);

        let requested = names(&["relevance", "banana"]);
        let report = normalize(&raw, &requested);

        assert_eq!(report.len(), 2);
        assert!(report.get("relevance").is_some());
        assert!(report.get("banana").is_some());
        assert!(report.get("faithfulness").is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_every_requested_name_gets_a_score(
                metrics in proptest::collection::vec("[a-z]{1,12}", 0..8),
            ) {
                let raw = EngineScores::new();
                let report = normalize(&raw, &metrics);

                let unique: std::collections::BTreeSet<_> = metrics.iter().collect();
                prop_assert_eq!(report.len(), unique.len());
                for metric in &metrics {
                    prop_assert!(report.get(metric).is_some());
                }
            }
        }
    }
}
