use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::LlmClient;
use crate::report::ReportRenderer;
use crate::telemetry::metrics::ANALYSIS_DURATION;

use super::GenerationSettings;
use super::bundle::ResultBundle;
use super::{fanout, summary};

/// Entry point of the pipeline: fan out over the six dimensions, fan in to
/// the summary, and hand back a complete bundle.
#[derive(Clone)]
pub struct Analyzer {
    llm: Arc<LlmClient>,
    settings: Arc<GenerationSettings>,
    renderer: ReportRenderer,
}

impl Analyzer {
    pub fn new(llm: Arc<LlmClient>, settings: GenerationSettings) -> Self {
        Self {
            llm,
            settings: Arc::new(settings),
            renderer: ReportRenderer::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: ReportRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Always returns a bundle with six outcomes, even when every backend
    /// call failed.
    #[tracing::instrument(
        name = "pipeline analyze",
        skip_all,
        fields(
            analysis.id,
            submission.chars = submission.chars().count(),
            analysis.successes,
            analysis.summary_present,
            analysis.duration_ms,
        )
    )]
    pub async fn analyze(&self, submission: &str) -> ResultBundle {
        let start = Instant::now();
        let id = Uuid::new_v4();

        let span = tracing::Span::current();
        span.record("analysis.id", id.to_string());

        let shared: Arc<str> = Arc::from(submission);
        let dimensions = fanout::run_all(
            Arc::clone(&self.llm),
            Arc::clone(&self.settings),
            Arc::clone(&shared),
        )
        .await;

        // Fan-in: the summary only ever sees fully settled outcomes.
        let summary = summary::synthesize(&self.llm, &self.settings, &shared, &dimensions).await;

        let duration = start.elapsed();
        ANALYSIS_DURATION.record(duration.as_secs_f64(), &[]);

        span.record("analysis.successes", dimensions.success_count());
        span.record("analysis.summary_present", summary.is_some());
        span.record("analysis.duration_ms", duration.as_millis() as u64);

        tracing::info!(
            analysis.id = %id,
            successes = dimensions.success_count(),
            failures = dimensions.failure_count(),
            summary_present = summary.is_some(),
            duration_ms = duration.as_millis() as u64,
            "analysis complete"
        );

        ResultBundle {
            id,
            submission: submission.to_string(),
            dimensions,
            summary,
            generated_at: Utc::now(),
        }
    }

    /// Analyze, then render. Rendering is the only failure a caller sees.
    pub async fn analyze_and_render(
        &self,
        submission: &str,
    ) -> Result<(ResultBundle, Vec<u8>), AppError> {
        let bundle = self.analyze(submission).await;
        let document = self.renderer.render_blocking(bundle.clone()).await?;
        Ok((bundle, document))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::analysis::{Dimension, DimensionOutcome};
    use crate::llm::mock::ScriptedProvider;

    fn analyzer(provider: Arc<ScriptedProvider>) -> Analyzer {
        let llm = Arc::new(LlmClient::new(
            provider,
            "https://example.test",
            Duration::from_secs(5),
        ));
        Analyzer::new(llm, GenerationSettings::uniform("mock-model"))
    }

    #[tokio::test]
    async fn test_analyze_runs_summary_after_dimensions() {
        let provider = Arc::new(
            ScriptedProvider::answering_all("dimension text").respond("summary", "the summary"),
        );
        let bundle = analyzer(provider.clone()).analyze("I live at 123 Oak St").await;

        assert_eq!(bundle.dimensions.success_count(), 6);
        assert_eq!(bundle.summary.as_deref(), Some("the summary"));
        assert_eq!(bundle.submission, "I live at 123 Oak St");

        let calls = provider.calls();
        assert_eq!(calls.len(), 7);
        assert_eq!(calls.last().map(|c| c.stage.as_str()), Some("summary"));
    }

    #[tokio::test]
    async fn test_summary_failure_keeps_bundle() {
        let provider = Arc::new(ScriptedProvider::answering_all("text").fail("summary"));
        let bundle = analyzer(provider).analyze("hello").await;

        assert_eq!(bundle.dimensions.success_count(), 6);
        assert!(bundle.summary.is_none());
    }

    #[tokio::test]
    async fn test_summary_sees_failed_dimension() {
        let provider = Arc::new(
            ScriptedProvider::answering_all("text")
                .fail("manipulability")
                .respond("summary", "ok"),
        );
        let bundle = analyzer(provider.clone()).analyze("hello").await;

        assert!(matches!(
            bundle.dimensions.get(Dimension::Manipulability),
            DimensionOutcome::Failure { .. }
        ));

        let calls = provider.calls();
        let summary_call = calls.iter().find(|c| c.stage == "summary").unwrap();
        assert!(
            summary_call.messages[1]
                .content
                .contains("Manipulability (Manipulability Watch): analysis unavailable")
        );
    }

    #[tokio::test]
    async fn test_analyze_and_render_returns_document() {
        let provider = Arc::new(ScriptedProvider::answering_all("text"));
        let (bundle, document) = analyzer(provider).analyze_and_render("hello").await.unwrap();

        assert_eq!(bundle.dimensions.success_count(), 6);
        assert!(document.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_analyze_and_render_uses_configured_font() {
        let chars: Vec<char> = "我住在北京".chars().collect();
        let font = crate::report::font::EmbeddedFont::from_bytes(
            crate::report::font::test_font(&chars),
        )
        .unwrap();
        let provider = Arc::new(ScriptedProvider::answering_all("我住在北京"));
        let analyzer = analyzer(provider).with_renderer(ReportRenderer::with_font(font));

        let (_, document) = analyzer.analyze_and_render("我住在北京").await.unwrap();
        let pdf = String::from_utf8_lossy(&document);

        assert!(analyzer.renderer().has_embedded_font());
        assert!(pdf.contains("<00010002000300040005> Tj"));
        assert!(!pdf.contains("(?????) Tj"));
    }
}
