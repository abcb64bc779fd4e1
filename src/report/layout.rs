use crate::analysis::ResultBundle;

use super::canvas::{Canvas, CanvasError, Color, TextStyle};
use super::pdf::MARGIN;

pub const REPORT_TITLE: &str = "PRIVACY PRISM";
pub const REPORT_SUBTITLE: &str = "Privacy Risk Analysis Report";
pub const SUMMARY_HEADING: &str = "Executive Summary";
pub const PREVIEW_LIMIT: usize = 800;

const PRIMARY: Color = Color::rgb(0x66, 0x7e, 0xea);
const TEXT: Color = Color::rgb(0x2c, 0x3e, 0x50);
const MUTED: Color = Color::rgb(0x7f, 0x8c, 0x8d);
const PREVIEW: Color = Color::rgb(0x55, 0x55, 0x55);

const CONTENT_WIDTH: f32 = 495.0;
const HEADING: TextStyle = TextStyle::new(24.0, PRIMARY);

/// Logical sections of a report, in print order.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Cover {
        title: String,
        subtitle: String,
        generated_at: String,
        preview: String,
    },
    Dimension {
        ordinal: usize,
        heading: String,
        body: String,
    },
    Summary {
        body: String,
    },
}

/// Cover, then the six dimensions in declaration order, then the summary
/// when there is a non-blank one.
pub fn build_sections(bundle: &ResultBundle) -> Vec<Section> {
    let mut sections = Vec::with_capacity(8);

    sections.push(Section::Cover {
        title: REPORT_TITLE.to_string(),
        subtitle: REPORT_SUBTITLE.to_string(),
        generated_at: bundle
            .generated_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        preview: preview(&bundle.submission),
    });

    for (i, (dimension, outcome)) in bundle.dimensions.iter().enumerate() {
        sections.push(Section::Dimension {
            ordinal: i + 1,
            heading: dimension.label().to_uppercase(),
            body: outcome.display_text().to_string(),
        });
    }

    if let Some(summary) = bundle.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        sections.push(Section::Summary {
            body: summary.to_string(),
        });
    }

    sections
}

/// First [`PREVIEW_LIMIT`] characters of the submission, with `...` when cut.
pub fn preview(submission: &str) -> String {
    match submission.char_indices().nth(PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}...", &submission[..cut]),
        None => submission.to_string(),
    }
}

/// Every section starts on its own page.
pub fn paint<C: Canvas>(sections: &[Section], canvas: &mut C) -> Result<(), CanvasError> {
    for section in sections {
        canvas.add_page()?;
        match section {
            Section::Cover {
                title,
                subtitle,
                generated_at,
                preview,
            } => {
                let (page_width, _) = canvas.page_size();
                let full_width = page_width - 2.0 * MARGIN;

                let title_style = TextStyle::new(36.0, PRIMARY).centered();
                canvas.text(MARGIN, 200.0, full_width, title, &title_style)?;
                let subtitle_style = TextStyle::new(16.0, TEXT).centered();
                canvas.text(MARGIN, 260.0, full_width, subtitle, &subtitle_style)?;
                canvas.text(
                    MARGIN,
                    300.0,
                    full_width,
                    &format!("Generated on {generated_at}"),
                    &TextStyle::new(12.0, MUTED).centered(),
                )?;
                canvas.line((150.0, 340.0), (445.0, 340.0), 3.0, PRIMARY);
                canvas.text(
                    MARGIN,
                    370.0,
                    CONTENT_WIDTH,
                    "Analyzed Content",
                    &TextStyle::new(14.0, TEXT),
                )?;
                canvas.text(
                    MARGIN,
                    395.0,
                    CONTENT_WIDTH,
                    preview,
                    &TextStyle::new(10.0, PREVIEW).with_line_gap(3.0),
                )?;
            }
            Section::Dimension {
                ordinal,
                heading,
                body,
            } => {
                let number = format!("{ordinal:02}");
                canvas.text(MARGIN, 50.0, CONTENT_WIDTH, &number, &TextStyle::new(48.0, PRIMARY))?;
                canvas.text(MARGIN, 110.0, CONTENT_WIDTH, heading, &HEADING)?;
                canvas.line((MARGIN, 145.0), (MARGIN + CONTENT_WIDTH, 145.0), 2.0, PRIMARY);
                canvas.text(
                    MARGIN,
                    165.0,
                    CONTENT_WIDTH,
                    body,
                    &TextStyle::new(11.0, TEXT).with_line_gap(4.0),
                )?;
            }
            Section::Summary { body } => {
                canvas.text(MARGIN, 80.0, CONTENT_WIDTH, SUMMARY_HEADING, &HEADING)?;
                canvas.text(
                    MARGIN,
                    130.0,
                    CONTENT_WIDTH,
                    body,
                    &TextStyle::new(11.0, TEXT).with_line_gap(4.0),
                )?;
            }
        }
    }

    Ok(())
}
