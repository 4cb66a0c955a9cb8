//! # rubric-runtime
//!
//! Provider-agnostic LLM metric evaluation adapter.
//!
//! One call scores a single (input, output) pair against a set of named
//! quality metrics using a pluggable LLM-backed engine, and degrades
//! through fixed tiers instead of failing the caller:
//!
//! 1. engine or provider library unavailable → deterministic heuristics
//!    from `rubric-core`
//! 2. provider detection or chat-capability construction failed →
//!    deterministic heuristics
//! 3. the engine itself failed mid-execution → uniform neutral 0.5
//! 4. a single metric came back missing or non-numeric → per-metric
//!    sentinels, siblings untouched
//!
//! The adapter also guarantees the engine a compatible scheduler: when the
//! ambient runtime cannot be shared, the whole evaluation is re-executed
//! on a dedicated worker with a fresh one (see [`isolation`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::collections::BTreeMap;
//! use rubric_runtime::EngineAdapter;
//!
//! let adapter = EngineAdapter::new();
//!
//! let metrics = vec!["relevance".to_string(), "faithfulness".to_string()];
//! let scores = adapter
//!     .evaluate("What is the capital of France?",
//!               "Paris is the capital of France.",
//!               &metrics,
//!               &BTreeMap::new())
//!     .await;
//!
//! // Every requested metric is present, whatever happened inside.
//! assert_eq!(scores.len(), 2);
//! ```

pub mod adapter;
pub mod binding;
pub mod capability;
pub mod engine;
mod executor;
pub mod isolation;
mod normalize;
pub mod providers;

// Re-export main types at crate root
pub use adapter::{AdapterError, EngineAdapter, EngineAdapterBuilder};
pub use binding::{bind, MetricBinding, RunConfig};
pub use capability::{CapabilityError, CapabilityFactory, ChatModel, EmbeddingModel};
pub use engine::{EngineError, EngineScores, EvalRecord, EvaluationEngine, JudgeEngine};
pub use isolation::{ExecutionContext, ExecutionStrategy, IsolationError};
pub use providers::{detect, ApiCredential, ProviderConfig, ProviderError, ProviderKind};

#[cfg(feature = "http-providers")]
pub use providers::{HttpCapabilityFactory, OpenAiCompatClient};
