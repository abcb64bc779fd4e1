use opentelemetry::KeyValue;

use crate::llm::{GenerateRequest, LlmClient};
use crate::telemetry::metrics::DIMENSION_OUTCOMES;

use super::GenerationSettings;
use super::bundle::DimensionOutcome;
use super::dimensions::Dimension;

/// Runs one dimension against the backend. Never fails: every backend error,
/// and any blank answer, comes back as [`DimensionOutcome::Failure`].
#[tracing::instrument(
    name = "analysis_worker",
    skip(llm, settings, submission),
    fields(
        analysis.dimension = %dimension,
        analysis.outcome,
    )
)]
pub async fn run_worker(
    llm: &LlmClient,
    settings: &GenerationSettings,
    dimension: Dimension,
    submission: &str,
) -> DimensionOutcome {
    let request = GenerateRequest {
        model: settings.model_for(dimension).to_string(),
        messages: dimension.build_messages(submission),
        temperature: settings.temperature,
        max_tokens: settings.dimension_max_tokens,
        stage: dimension.key().to_string(),
    };

    let outcome = match llm.generate(&request).await {
        Ok(resp) => outcome_from_text(&resp.content),
        Err(err) => DimensionOutcome::Failure {
            reason: err.to_string(),
        },
    };

    if let DimensionOutcome::Failure { reason } = &outcome {
        tracing::warn!(dimension = %dimension, reason = %reason, "dimension analysis failed");
    }

    tracing::Span::current().record("analysis.outcome", outcome.status());
    DIMENSION_OUTCOMES.add(
        1,
        &[
            KeyValue::new("analysis.dimension", dimension.key()),
            KeyValue::new("analysis.status", outcome.status()),
        ],
    );

    outcome
}

pub(crate) fn outcome_from_text(text: &str) -> DimensionOutcome {
    let text = text.trim();
    if text.is_empty() {
        DimensionOutcome::Failure {
            reason: "generation backend returned an empty response".to_string(),
        }
    } else {
        DimensionOutcome::Success {
            text: text.to_string(),
        }
    }
}
