//! Score reports with per-metric provenance.
//!
//! The adapter's plain contract is a flat name → value map, but every tier
//! of degradation is recorded here so callers who need it can tell an
//! engine score from a heuristic stand-in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Neutral stand-in applied uniformly after an engine execution failure.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Sentinel for a metric the engine ran but returned not-a-number for.
///
/// Deliberately above [`MISSING_SCORE`] so likely-transient numeric
/// instability is not penalized as hard as a missing result.
pub const DEGENERATE_SCORE: f64 = 0.7;

/// Sentinel for a metric absent from the engine's result.
pub const MISSING_SCORE: f64 = 0.0;

/// Where a score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Produced by the evaluation engine.
    Engine,

    /// Heuristic fallback; the engine or its provider was unavailable.
    Heuristic,

    /// Neutral stand-in after the engine itself failed mid-execution.
    Neutral,

    /// Engine ran but returned a non-numeric value for this metric.
    Degenerate,

    /// Engine result lacked the key this metric maps to.
    Missing,
}

/// A single metric score with provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub source: ScoreSource,
}

impl Score {
    pub fn new(value: f64, source: ScoreSource) -> Self {
        Self { value, source }
    }

    /// A raw engine value, passed through unclamped.
    pub fn engine(value: f64) -> Self {
        Self::new(value, ScoreSource::Engine)
    }

    pub fn heuristic(value: f64) -> Self {
        Self::new(value, ScoreSource::Heuristic)
    }
}

/// Complete result of one evaluation call.
///
/// Invariant: contains every requested metric name exactly once, regardless
/// of which tier produced each score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Scores keyed by caller metric name.
    pub scores: BTreeMap<String, Score>,

    /// When this report was produced.
    pub evaluated_at: DateTime<Utc>,
}

impl ScoreReport {
    pub fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
            evaluated_at: Utc::now(),
        }
    }

    /// A report assigning the same score to every requested metric.
    pub fn uniform(metrics: &[String], score: Score) -> Self {
        let mut report = Self::new();
        for metric in metrics {
            report.insert(metric.clone(), score);
        }
        report
    }

    pub fn insert(&mut self, metric: impl Into<String>, score: Score) {
        self.scores.insert(metric.into(), score);
    }

    pub fn get(&self, metric: &str) -> Option<&Score> {
        self.scores.get(metric)
    }

    /// Flatten to the plain name → value contract.
    pub fn values(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|(name, score)| (name.clone(), score.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Default for ScoreReport {
    fn default() -> Self {
        Self::new()
    }
}
