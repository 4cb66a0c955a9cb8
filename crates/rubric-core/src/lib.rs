//! # rubric-core
//!
//! Deterministic metric vocabulary and heuristic scoring for rubric.
//!
//! This crate holds everything the evaluation adapter can rely on when the
//! LLM-backed engine is unavailable:
//!
//! - the fixed metric catalog (caller vocabulary ↔ engine vocabulary,
//!   with static capability-requirement tags)
//! - the dependency-free heuristic fallback scorer
//! - score/report types with per-metric provenance
//! - the request shape and recognized parameter keys
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same input always produces the same scores
//! 2. **No LLM calls**: everything here is pure computation
//! 3. **Complete**: a report built for a request covers every requested
//!    metric name exactly once
//!
//! ## Example
//!
//! ```rust
//! use rubric_core::heuristics::heuristic_report;
//!
//! let metrics = vec!["relevance".to_string(), "correctness".to_string()];
//! let report = heuristic_report(
//!     "What is the capital of France?",
//!     "Paris is the capital of France.",
//!     &metrics,
//! );
//!
//! assert_eq!(report.len(), 2);
//! ```

pub mod catalog;
pub mod heuristics;
pub mod report;
pub mod types;

// Re-export main types at crate root
pub use catalog::{default_spec, lookup, EngineMetric, MetricSpec};
pub use heuristics::{heuristic_report, heuristic_score};
pub use report::{
    Score, ScoreReport, ScoreSource, DEGENERATE_SCORE, MISSING_SCORE, NEUTRAL_SCORE,
};
pub use types::{params, EvaluationRequest};
