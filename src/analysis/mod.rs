pub mod bundle;
pub mod dimensions;
pub mod fanout;
pub mod orchestrator;
pub mod summary;
pub mod worker;

pub use bundle::{DimensionOutcome, DimensionResults, ResultBundle, UNAVAILABLE_PLACEHOLDER};
pub use dimensions::{Dimension, lookup};
pub use orchestrator::Analyzer;

use crate::config::Config;

/// Models and sampling parameters for every backend call of a run.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub dimension_models: [String; 6],
    pub summary_model: String,
    pub temperature: f32,
    pub dimension_max_tokens: u32,
    pub summary_max_tokens: u32,
}

impl GenerationSettings {
    /// Same model for every dimension and the summary.
    pub fn uniform(model: &str) -> Self {
        Self {
            dimension_models: Dimension::ALL.map(|_| model.to_string()),
            summary_model: model.to_string(),
            temperature: 0.6,
            dimension_max_tokens: 600,
            summary_max_tokens: 1200,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            dimension_models: Dimension::ALL.map(|d| config.model_for(d).to_string()),
            summary_model: config.summary_model.clone(),
            temperature: config.default_temperature,
            dimension_max_tokens: config.dimension_max_tokens,
            summary_max_tokens: config.summary_max_tokens,
        }
    }

    pub fn model_for(&self, dimension: Dimension) -> &str {
        &self.dimension_models[dimension.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_settings() {
        let settings = GenerationSettings::uniform("kimi-k2-turbo-preview");
        for dimension in Dimension::ALL {
            assert_eq!(settings.model_for(dimension), "kimi-k2-turbo-preview");
        }
        assert_eq!(settings.summary_model, "kimi-k2-turbo-preview");
    }
}
