//! Evaluation engine seam.
//!
//! The engine consumes a single-record dataset and the bound metrics, and
//! reports raw per-metric values keyed by the engine's own vocabulary. Any
//! engine-level failure is a full-batch failure; per-metric degradation
//! (missing keys, non-numeric values) is left in the raw result for the
//! normalizer to handle.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use rubric_core::catalog::EngineMetric;

use crate::binding::MetricBinding;

mod judge;

pub use judge::JudgeEngine;

/// Errors from engine execution.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine rejected the dataset: {0}")]
    InvalidRecord(String),

    #[error("judge call failed: {0}")]
    Capability(#[from] crate::capability::CapabilityError),

    #[error("engine failure: {0}")]
    Internal(anyhow::Error),
}

impl EngineError {
    /// Wrap an engine-internal failure that has no stable shape.
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal(error.into())
    }
}

/// The single-record dataset handed to the engine.
///
/// The context list is never empty: when the caller supplied no context, a
/// placeholder passage stands in. Ground truth mirrors the answer so
/// similarity metrics always have a reference.
#[derive(Debug, Clone, Serialize)]
pub struct EvalRecord {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<String>,
    pub ground_truth: String,
}

impl EvalRecord {
    /// The context passage the engine should ground on.
    pub fn context_passage(&self) -> &str {
        self.contexts.first().map(String::as_str).unwrap_or_default()
    }
}

/// Raw per-metric results, keyed by engine vocabulary.
pub type EngineScores = BTreeMap<EngineMetric, f64>;

/// A metric-computation engine bound to LLM/embedding capabilities
/// through the metric bindings it receives.
#[async_trait]
pub trait EvaluationEngine: Send + Sync {
    /// Score the record against every bound metric.
    async fn evaluate(
        &self,
        record: &EvalRecord,
        bindings: &[MetricBinding],
    ) -> Result<EngineScores, EngineError>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}
