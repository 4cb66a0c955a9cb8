//! Top-level evaluation adapter.
//!
//! One call scores a single (input, output) pair against the requested
//! metrics, and no exception crosses the outer boundary: every failure
//! tier converts to scores.
//!
//! | tier | trigger | result |
//! |------|---------|--------|
//! | unavailable | no engine / no capability factory configured | heuristic scores |
//! | provider | detection failed, chat handle construction failed | heuristic scores |
//! | engine | the engine itself threw | uniform neutral 0.5 |
//! | per-metric | NaN / missing key in the raw result | 0.7 / 0.0 sentinels |
//!
//! Within one call the pipeline is strictly sequential: detect provider →
//! bind metrics → execute → normalize. Nothing mutable is shared across
//! calls; provider config and bindings are built fresh and dropped at call
//! end.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use rubric_core::heuristics;
use rubric_core::report::{Score, ScoreReport, ScoreSource};
use rubric_core::types::EvaluationRequest;
use rubric_core::NEUTRAL_SCORE;

use crate::binding;
use crate::capability::{CapabilityError, CapabilityFactory};
use crate::engine::{EngineError, EvaluationEngine};
use crate::executor;
use crate::isolation::{self, ExecutionContext, ExecutionStrategy, IsolationError};
use crate::normalize;
use crate::providers::{self, ProviderError};

/// Errors absorbed inside the adapter; callers never see them.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("provider configuration: {0}")]
    Provider(#[from] ProviderError),

    #[error("capability construction: {0}")]
    Capability(#[from] CapabilityError),

    #[error("engine execution: {0}")]
    Engine(#[from] EngineError),

    #[error("isolated execution: {0}")]
    Isolation(#[from] IsolationError),
}

/// The evaluation adapter.
///
/// Construct via [`EngineAdapter::builder`], or [`EngineAdapter::new`]
/// when the `http-providers` feature supplies the default wiring.
pub struct EngineAdapter {
    engine: Option<Arc<dyn EvaluationEngine>>,
    capabilities: Option<Arc<dyn CapabilityFactory>>,
    context_override: Option<ExecutionContext>,
}

impl EngineAdapter {
    pub fn builder() -> EngineAdapterBuilder {
        EngineAdapterBuilder::new()
    }

    /// Adapter with the built-in judge engine and HTTP capability factory.
    #[cfg(feature = "http-providers")]
    pub fn new() -> Self {
        Self::builder()
            .engine(Arc::new(crate::engine::JudgeEngine::new()))
            .capabilities(Arc::new(crate::providers::HttpCapabilityFactory::new()))
            .build()
    }

    /// Score the pair against the requested metrics.
    ///
    /// Always returns a value for every requested metric name; never
    /// fails. Degradation severity is logged, not surfaced here — use
    /// [`evaluate_report`](Self::evaluate_report) for provenance.
    pub async fn evaluate(
        &self,
        input_text: &str,
        output_text: &str,
        metrics: &[String],
        params: &BTreeMap<String, String>,
    ) -> BTreeMap<String, f64> {
        self.evaluate_report(input_text, output_text, metrics, params)
            .await
            .values()
    }

    /// Like [`evaluate`](Self::evaluate), with per-metric provenance.
    pub async fn evaluate_report(
        &self,
        input_text: &str,
        output_text: &str,
        metrics: &[String],
        params: &BTreeMap<String, String>,
    ) -> ScoreReport {
        let request = EvaluationRequest {
            input_text: input_text.to_string(),
            output_text: output_text.to_string(),
            metrics: metrics.to_vec(),
            params: params.clone(),
        };
        self.evaluate_request(&request).await
    }

    /// Score a pre-built request.
    pub async fn evaluate_request(&self, request: &EvaluationRequest) -> ScoreReport {
        let (Some(engine), Some(capabilities)) = (&self.engine, &self.capabilities) else {
            tracing::warn!("evaluation engine unavailable, using heuristic scoring");
            return heuristic_report(request);
        };

        let context = self
            .context_override
            .unwrap_or_else(ExecutionContext::current);

        let outcome = match context.strategy() {
            ExecutionStrategy::Direct => run_tiers(engine, capabilities, request).await,
            ExecutionStrategy::IsolatedWorker => {
                tracing::info!(
                    context = ?context,
                    "ambient scheduler incompatible with engine, running isolated"
                );

                let engine = Arc::clone(engine);
                let capabilities = Arc::clone(capabilities);
                let isolated_request = request.clone();

                match isolation::run_isolated(&request.params, move || async move {
                    run_tiers(&engine, &capabilities, &isolated_request).await
                })
                .await
                {
                    Ok(inner) => inner,
                    Err(error) => Err(AdapterError::from(error)),
                }
            }
        };

        match outcome {
            Ok(report) => report,
            Err(AdapterError::Engine(error)) => {
                tracing::error!(error = %error, "engine execution failed, scoring neutral");
                ScoreReport::uniform(
                    &request.metrics,
                    Score::new(NEUTRAL_SCORE, ScoreSource::Neutral),
                )
            }
            Err(error) => {
                tracing::error!(error = %error, "evaluation failed, using heuristic scoring");
                heuristic_report(request)
            }
        }
    }
}

#[cfg(feature = "http-providers")]
impl Default for EngineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn heuristic_report(request: &EvaluationRequest) -> ScoreReport {
    heuristics::heuristic_report(&request.input_text, &request.output_text, &request.metrics)
}

/// The sequential pipeline behind one evaluation: detect provider, build
/// capabilities, bind metrics, execute, normalize. The error variant
/// decides the failure tier upstream.
async fn run_tiers(
    engine: &Arc<dyn EvaluationEngine>,
    capabilities: &Arc<dyn CapabilityFactory>,
    request: &EvaluationRequest,
) -> Result<ScoreReport, AdapterError> {
    let (kind, config) = providers::detect(&request.params)?;
    tracing::info!(provider = %kind, "detected provider");

    let llm = capabilities.chat(kind, &config)?;

    let embeddings = match capabilities.embeddings(kind, &config) {
        Ok(handle) => Some(handle),
        Err(error) => {
            tracing::warn!(
                error = %error,
                "embedding construction failed, proceeding without embeddings"
            );
            None
        }
    };

    let bindings = binding::bind(&request.metrics, &llm, embeddings.as_ref());
    let raw = executor::run(engine.as_ref(), request, &bindings).await?;

    Ok(normalize::normalize(&raw, &request.metrics))
}

/// Builder for [`EngineAdapter`].
pub struct EngineAdapterBuilder {
    engine: Option<Arc<dyn EvaluationEngine>>,
    capabilities: Option<Arc<dyn CapabilityFactory>>,
    context_override: Option<ExecutionContext>,
}

impl EngineAdapterBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            capabilities: None,
            context_override: None,
        }
    }

    /// Set the evaluation engine. Without one, every call scores
    /// heuristically.
    pub fn engine(mut self, engine: Arc<dyn EvaluationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the capability factory. Without one, every call scores
    /// heuristically.
    pub fn capabilities(mut self, capabilities: Arc<dyn CapabilityFactory>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Pin the execution context instead of inspecting the ambient
    /// scheduler. Intended for tests and callers that know their runtime.
    pub fn execution_context(mut self, context: ExecutionContext) -> Self {
        self.context_override = Some(context);
        self
    }

    pub fn build(self) -> EngineAdapter {
        EngineAdapter {
            engine: self.engine,
            capabilities: self.capabilities,
            context_override: self.context_override,
        }
    }
}

impl Default for EngineAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
