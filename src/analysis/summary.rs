use opentelemetry::KeyValue;

use crate::llm::{ChatMessage, GenerateRequest, LlmClient};
use crate::telemetry::metrics::SUMMARY_OUTCOMES;

use super::GenerationSettings;
use super::bundle::{DimensionOutcome, DimensionResults};

const SUMMARY_STAGE: &str = "summary";

const SUMMARY_SYSTEM_PROMPT: &str = "You are the Prism Conductor. After the six privacy \
    analysts report, you combine their findings into one cross-dimensional narrative for \
    decision-makers. Some analysts may be marked unavailable; say so where it limits your \
    conclusions instead of guessing what they would have found.";

/// One line per dimension in declaration order. Failed dimensions are listed
/// with their reason so the narrative can account for the missing signal.
pub fn findings_block(results: &DimensionResults) -> String {
    results
        .iter()
        .map(|(dimension, outcome)| {
            let finding = match outcome {
                DimensionOutcome::Success { text } => text.clone(),
                DimensionOutcome::Failure { reason } => {
                    format!("analysis unavailable ({reason})")
                }
            };
            format!(
                "- {} ({}): {}",
                dimension.label(),
                dimension.codename(),
                finding
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_summary_messages(submission: &str, results: &DimensionResults) -> Vec<ChatMessage> {
    let prompt = format!(
        "Original Submission:\n\"\"\"\n{submission}\n\"\"\"\n\n\
        Analyst Findings (verbatim):\n{findings}\n\n\
        Write a 180-220 word executive summary containing:\n\
        - Overall Privacy Posture (High / Medium / Low with a one-line justification)\n\
        - The three most important cross-cutting insights, naming the analysts they come from\n\
        - Action Blueprint: three prioritized steps that combine policy, communication and \
        technical mitigations\n\n\
        Use polished English suitable for a security leadership briefing.",
        findings = findings_block(results),
    );

    vec![
        ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ]
}

/// Fan-in step: one backend call over the settled outcomes. Any failure
/// yields `None`; a missing summary never fails the run.
#[tracing::instrument(
    name = "summary_synthesis",
    skip_all,
    fields(
        analysis.stage = SUMMARY_STAGE,
        summary.present,
    )
)]
pub async fn synthesize(
    llm: &LlmClient,
    settings: &GenerationSettings,
    submission: &str,
    results: &DimensionResults,
) -> Option<String> {
    let request = GenerateRequest {
        model: settings.summary_model.clone(),
        messages: build_summary_messages(submission, results),
        temperature: settings.temperature,
        max_tokens: settings.summary_max_tokens,
        stage: SUMMARY_STAGE.to_string(),
    };

    let summary = match llm.generate(&request).await {
        Ok(resp) => {
            let text = resp.content.trim();
            if text.is_empty() {
                tracing::warn!("summary synthesis returned an empty response");
                None
            } else {
                Some(text.to_string())
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "summary synthesis failed, continuing without summary");
            None
        }
    };

    let status = if summary.is_some() { "success" } else { "failure" };
    tracing::Span::current().record("summary.present", summary.is_some());
    SUMMARY_OUTCOMES.add(1, &[KeyValue::new("analysis.status", status)]);

    summary
}
