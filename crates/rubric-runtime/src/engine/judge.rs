//! Built-in LLM-as-judge engine.
//!
//! Scores each bound metric by prompting the binding's chat handle for a
//! JSON verdict. Answer similarity prefers embedding cosine similarity
//! when an embedding handle is attached. All bound metrics are judged
//! concurrently; the record is shared, the verdicts are independent.
//!
//! A judge response that cannot be parsed yields NaN for that metric so
//! the batch survives and the normalizer applies its sentinel. A
//! transport-level failure that outlives the binding's retry budget fails
//! the whole batch.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tokio::time::timeout;

use rubric_core::catalog::EngineMetric;

use crate::binding::MetricBinding;
use crate::capability::{CapabilityError, EmbeddingModel};

use super::{EngineError, EngineScores, EvalRecord, EvaluationEngine};

const RELEVANCY_PROMPT: &str = r#"Evaluate how relevant the answer is to the question.

QUESTION:
{question}

ANSWER:
{answer}

Does the answer directly address the question, and is it complete?

Respond in JSON:
{"score": <float 0-1>, "reasoning": "<one sentence>"}"#;

const CORRECTNESS_PROMPT: &str = r#"Evaluate the factual correctness of the answer against the reference.

QUESTION:
{question}

ANSWER:
{answer}

REFERENCE:
{reference}

Weigh factual agreement with the reference above phrasing or style.

Respond in JSON:
{"score": <float 0-1>, "reasoning": "<one sentence>"}"#;

const SIMILARITY_PROMPT: &str = r#"Evaluate the semantic similarity between the answer and the reference.

ANSWER:
{answer}

REFERENCE:
{reference}

Respond in JSON:
{"score": <float 0-1>, "reasoning": "<one sentence>"}"#;

const FAITHFULNESS_PROMPT: &str = r#"Evaluate whether the answer is faithful to the context (no hallucinations).

CONTEXT:
{context}

ANSWER:
{answer}

Extract the claims made by the answer and verify each against the context.
Score the fraction of claims the context supports.

Respond in JSON:
{"score": <float 0-1>, "reasoning": "<one sentence>"}"#;

#[derive(Debug, Deserialize)]
struct JudgeVerdict {
    score: f64,
}

/// LLM-as-judge implementation of [`EvaluationEngine`].
#[derive(Debug, Default)]
pub struct JudgeEngine;

impl JudgeEngine {
    pub fn new() -> Self {
        Self
    }

    fn prompt_for(metric: EngineMetric, record: &EvalRecord) -> String {
        let template = match metric {
            EngineMetric::AnswerRelevancy => RELEVANCY_PROMPT,
            EngineMetric::AnswerCorrectness => CORRECTNESS_PROMPT,
            EngineMetric::AnswerSimilarity => SIMILARITY_PROMPT,
            EngineMetric::Faithfulness => FAITHFULNESS_PROMPT,
        };

        template
            .replace("{question}", &record.question)
            .replace("{answer}", &record.answer)
            .replace("{reference}", &record.ground_truth)
            .replace("{context}", record.context_passage())
    }

    async fn judge_metric(
        &self,
        binding: &MetricBinding,
        record: &EvalRecord,
    ) -> Result<f64, EngineError> {
        if binding.engine_metric == EngineMetric::AnswerSimilarity {
            if let Some(embeddings) = &binding.embeddings {
                return Self::embedding_similarity(embeddings.as_ref(), record)
                    .await
                    .map_err(EngineError::from);
            }
        }

        let prompt = Self::prompt_for(binding.engine_metric, record);

        let mut attempt = 0;
        loop {
            let outcome = timeout(binding.run_config.timeout, binding.llm.complete(&prompt))
                .await
                .map_err(|_| CapabilityError::Timeout(binding.run_config.timeout))
                .and_then(|result| result);

            match outcome {
                Ok(response) => return Ok(Self::parse_score(&response)),
                Err(error) if attempt < binding.run_config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        metric = %binding.metric,
                        attempt,
                        error = %error,
                        "judge call failed, retrying"
                    );
                }
                Err(error) => return Err(EngineError::Capability(error)),
            }
        }
    }

    /// Pull the verdict out of the judge's response. Responses that do not
    /// contain parseable JSON yield NaN rather than failing the batch.
    fn parse_score(response: &str) -> f64 {
        Self::extract_json(response)
            .and_then(|json| serde_json::from_str::<JudgeVerdict>(json).ok())
            .map(|verdict| verdict.score)
            .unwrap_or(f64::NAN)
    }

    fn extract_json(response: &str) -> Option<&str> {
        let start = response.find('{')?;
        let end = response.rfind('}')?;
        (end > start).then(|| &response[start..=end])
    }

    async fn embedding_similarity(
        embeddings: &dyn EmbeddingModel,
        record: &EvalRecord,
    ) -> Result<f64, CapabilityError> {
        let (answer, reference) = futures::try_join!(
            embeddings.embed(&record.answer),
            embeddings.embed(&record.ground_truth)
        )?;

        Ok(Self::cosine(&answer, &reference).max(0.0))
    }

    fn cosine(a: &[f64], b: &[f64]) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

        if norm_a < 1e-9 || norm_b < 1e-9 {
            return 0.0;
        }

        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[async_trait]
impl EvaluationEngine for JudgeEngine {
    async fn evaluate(
        &self,
        record: &EvalRecord,
        bindings: &[MetricBinding],
    ) -> Result<EngineScores, EngineError> {
        let verdicts = join_all(bindings.iter().map(|binding| async move {
            (
                binding.engine_metric,
                self.judge_metric(binding, record).await,
            )
        }))
        .await;

        let mut scores = EngineScores::new();
        for (metric, verdict) in verdicts {
            scores.insert(metric, verdict?);
        }

        Ok(scores)
    }

    fn name(&self) -> &str {
        "judge"
    }
}
