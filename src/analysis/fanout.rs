use std::sync::Arc;

use tracing::Instrument;

use crate::llm::LlmClient;

use super::GenerationSettings;
use super::bundle::{DimensionOutcome, DimensionResults};
use super::dimensions::Dimension;
use super::worker::run_worker;

/// Starts all six workers before awaiting any of them, then waits for every
/// one to settle. A failing or slow dimension never cancels its siblings.
#[tracing::instrument(
    name = "fan_out",
    skip_all,
    fields(
        analysis.successes,
        analysis.failures,
    )
)]
pub async fn run_all(
    llm: Arc<LlmClient>,
    settings: Arc<GenerationSettings>,
    submission: Arc<str>,
) -> DimensionResults {
    let handles = Dimension::ALL.map(|dimension| {
        let llm = Arc::clone(&llm);
        let settings = Arc::clone(&settings);
        let submission = Arc::clone(&submission);
        let task = async move { run_worker(&llm, &settings, dimension, &submission).await };
        (dimension, tokio::spawn(task.in_current_span()))
    });

    // Every slot is overwritten below; join order does not affect placement.
    let mut outcomes = Dimension::ALL.map(|_| DimensionOutcome::Failure {
        reason: "worker did not settle".to_string(),
    });

    for ((dimension, handle), slot) in handles.into_iter().zip(outcomes.iter_mut()) {
        *slot = match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    dimension = %dimension,
                    error = %err,
                    "analysis worker task aborted"
                );
                DimensionOutcome::Failure {
                    reason: format!("analysis worker aborted: {err}"),
                }
            }
        };
    }

    let results = DimensionResults::new(outcomes);

    let span = tracing::Span::current();
    span.record("analysis.successes", results.success_count());
    span.record("analysis.failures", results.failure_count());

    results
}
