pub mod canvas;
pub mod font;
pub mod layout;
pub mod pdf;

use std::path::Path;
use std::sync::Arc;

use crate::analysis::ResultBundle;
use crate::error::AppError;
use crate::telemetry::metrics::REPORT_SIZE;

use canvas::Canvas;
use font::EmbeddedFont;
use pdf::PdfCanvas;

pub const CONTENT_TYPE: &str = "application/pdf";
pub const FILENAME: &str = "privacy-prism-report.pdf";

/// Renders bundles into PDF documents, optionally with an embedded font for
/// text the built-in Helvetica cannot show.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    font: Option<Arc<EmbeddedFont>>,
}

impl ReportRenderer {
    pub fn with_font(font: EmbeddedFont) -> Self {
        Self {
            font: Some(Arc::new(font)),
        }
    }

    /// Uses the font at `path` when it can be loaded, otherwise falls back to
    /// Helvetica and logs why.
    pub fn from_font_path(path: &Path) -> Self {
        match EmbeddedFont::load(path) {
            Ok(font) => {
                tracing::info!(
                    font.path = %path.display(),
                    font.name = font.postscript_name(),
                    "report font loaded"
                );
                Self::with_font(font)
            }
            Err(err) => {
                tracing::warn!(
                    font.path = %path.display(),
                    error = %err,
                    "report font unavailable, falling back to Helvetica"
                );
                Self::default()
            }
        }
    }

    pub fn has_embedded_font(&self) -> bool {
        self.font.is_some()
    }

    /// Lays out a finished bundle and paints it into a PDF document.
    #[tracing::instrument(
        name = "report_render",
        skip_all,
        fields(
            analysis.id = %bundle.id,
            report.embedded_font = self.font.is_some(),
            report.sections,
            report.pages,
            report.bytes,
        )
    )]
    pub fn render(&self, bundle: &ResultBundle) -> Result<Vec<u8>, AppError> {
        let sections = layout::build_sections(bundle);

        let mut canvas = PdfCanvas::new(layout::REPORT_TITLE);
        if let Some(font) = &self.font {
            canvas = canvas.with_font(Arc::clone(font));
        }
        layout::paint(&sections, &mut canvas).map_err(|e| AppError::Rendering(e.to_string()))?;
        let pages = canvas.page_count();

        let document = canvas
            .finish()
            .map_err(|e| AppError::Rendering(e.to_string()))?;

        let span = tracing::Span::current();
        span.record("report.sections", sections.len());
        span.record("report.pages", pages);
        span.record("report.bytes", document.len());
        REPORT_SIZE.record(document.len() as f64, &[]);

        Ok(document)
    }

    /// [`ReportRenderer::render`] on the blocking pool, for use from async
    /// handlers.
    pub async fn render_blocking(&self, bundle: ResultBundle) -> Result<Vec<u8>, AppError> {
        let renderer = self.clone();
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| renderer.render(&bundle)))
            .await
            .map_err(|e| AppError::Internal(format!("render task failed: {e}")))?
    }
}

/// Renders with Helvetica only.
pub fn render(bundle: &ResultBundle) -> Result<Vec<u8>, AppError> {
    ReportRenderer::default().render(bundle)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::analysis::{Dimension, DimensionOutcome, DimensionResults};

    fn bundle(outcome: DimensionOutcome, summary: Option<&str>) -> ResultBundle {
        ResultBundle {
            id: Uuid::new_v4(),
            submission: "My name is Alex and I live at 123 Oak St".to_string(),
            dimensions: DimensionResults::from_outcomes(
                Dimension::ALL.map(|d| (d, outcome.clone())),
            )
            .unwrap(),
            summary: summary.map(str::to_string),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_full_report() {
        let outcome = DimensionOutcome::Success {
            text: "Risk Verdict: Medium".to_string(),
        };
        let document = render(&bundle(outcome, Some("Overall posture: Medium."))).unwrap();
        let pdf = String::from_utf8_lossy(&document);

        assert!(pdf.starts_with("%PDF-1.4"));
        assert!(pdf.contains("/Count 8"));
        assert!(pdf.contains("(PRIVACY PRISM) Tj"));
        assert!(pdf.contains("(Executive Summary) Tj"));
        assert!(pdf.contains("(AUDIENCE & CONSEQUENCES) Tj"));
    }

    #[test]
    fn test_render_failures_show_placeholder() {
        let outcome = DimensionOutcome::Failure {
            reason: "503 service unavailable: simulated outage".to_string(),
        };
        let document = render(&bundle(outcome, None)).unwrap();
        let pdf = String::from_utf8_lossy(&document);

        assert!(pdf.contains("/Count 7"));
        assert_eq!(pdf.matches("(No analysis available) Tj").count(), 6);
        assert!(!pdf.contains("simulated outage"));
        assert!(!pdf.contains("(Executive Summary) Tj"));
    }

    #[tokio::test]
    async fn test_render_blocking() {
        let outcome = DimensionOutcome::Success {
            text: "ok".to_string(),
        };
        let document = ReportRenderer::default()
            .render_blocking(bundle(outcome, None))
            .await
            .unwrap();
        assert!(document.starts_with(b"%PDF-"));
    }

    fn cjk_renderer() -> ReportRenderer {
        let chars: Vec<char> = "我叫小明，住在上海北京".chars().collect();
        ReportRenderer::with_font(EmbeddedFont::from_bytes(font::test_font(&chars)).unwrap())
    }

    #[test]
    fn test_render_cjk_submission_with_embedded_font() {
        let mut bundle = bundle(
            DimensionOutcome::Success {
                text: "我住在上海".to_string(),
            },
            Some("我住在北京"),
        );
        bundle.submission = "我叫小明，住在上海".to_string();

        let document = cjk_renderer().render(&bundle).unwrap();
        let pdf = String::from_utf8_lossy(&document);

        assert!(pdf.contains("/Encoding /Identity-H"));
        assert!(!pdf.contains("(?????????) Tj"));
        assert!(!pdf.contains("(?????) Tj"));
        // glyph ids follow the order of the test font's characters
        assert!(pdf.contains("<000100020003000400050006000700080009> Tj"));
        assert!(pdf.contains("<00010006000700080009> Tj"));
        assert!(pdf.contains("<000100060007000A000B> Tj"));
        assert!(pdf.contains("<0001> <6211>"));
        assert!(pdf.contains("<000B> <4EAC>"));
    }

    #[test]
    fn test_render_without_font_substitutes_cjk() {
        let mut bundle = bundle(
            DimensionOutcome::Success {
                text: "ok".to_string(),
            },
            None,
        );
        bundle.submission = "我叫小明".to_string();

        let document = render(&bundle).unwrap();
        let pdf = String::from_utf8_lossy(&document);

        assert!(pdf.contains("(????) Tj"));
        assert!(!pdf.contains("/Type0"));
    }

    #[test]
    fn test_missing_font_falls_back_to_helvetica() {
        let renderer = ReportRenderer::from_font_path(Path::new("/nonexistent/NotoSansSC.otf"));
        assert!(!renderer.has_embedded_font());
    }

    #[test]
    fn test_font_loaded_from_path() {
        let path = std::env::temp_dir().join(format!("privacy-prism-{}.ttf", Uuid::new_v4()));
        std::fs::write(&path, font::test_font(&['我'])).unwrap();

        let renderer = ReportRenderer::from_font_path(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(renderer.has_embedded_font());
    }
}
