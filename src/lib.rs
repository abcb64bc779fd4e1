//! Privacy Prism: six-dimension privacy risk analysis of user-submitted
//! text, with an executive summary and a printable PDF report.

pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod report;
pub mod routes;
pub mod telemetry;

use analysis::Analyzer;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer }
    }
}
