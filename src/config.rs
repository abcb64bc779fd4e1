use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;

use crate::analysis::Dimension;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub llm_provider: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub default_model: String,
    pub dimension_models: Vec<(Dimension, String)>,
    pub summary_model: String,
    pub default_temperature: f32,
    pub dimension_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub report_font_path: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let default_model =
            env::var("MODEL").unwrap_or_else(|_| "kimi-k2-turbo-preview".to_string());

        let dimension_models = Dimension::ALL
            .iter()
            .map(|&dimension| {
                let var = format!("MODEL_{}", dimension.key().to_uppercase());
                let model = env::var(&var).unwrap_or_else(|_| default_model.clone());
                (dimension, model)
            })
            .collect();

        Ok(Self {
            port: parse_var("PORT", "5000")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.moonshot.cn/v1".to_string()),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            summary_model: env::var("SUMMARY_MODEL").unwrap_or_else(|_| default_model.clone()),
            default_model,
            dimension_models,
            default_temperature: parse_var("DEFAULT_TEMPERATURE", "0.6")?,
            dimension_max_tokens: parse_var("DIMENSION_MAX_TOKENS", "600")?,
            summary_max_tokens: parse_var("SUMMARY_MAX_TOKENS", "1200")?,
            llm_timeout_secs: parse_var("LLM_TIMEOUT_SECS", "90")?,
            report_font_path: env::var("REPORT_FONT_PATH")
                .unwrap_or_else(|_| "fonts/NotoSansSC.otf".to_string()),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "privacy-prism".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        })
    }

    /// Font embedded into reports when the file exists.
    pub fn report_font_path(&self) -> &Path {
        Path::new(&self.report_font_path)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Model used for one dimension, falling back to `MODEL`.
    pub fn model_for(&self, dimension: Dimension) -> &str {
        self.dimension_models
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, model)| model.as_str())
            .unwrap_or(&self.default_model)
    }

    /// API key for the configured provider. There is no built-in default key.
    pub fn provider_api_key(&self) -> anyhow::Result<&str> {
        let (key, var) = match self.llm_provider.as_str() {
            "anthropic" => (self.anthropic_api_key.as_deref(), "ANTHROPIC_API_KEY"),
            "openai" => (self.openai_api_key.as_deref(), "OPENAI_API_KEY"),
            other => return Err(anyhow!("unsupported LLM_PROVIDER: {other}")),
        };
        key.ok_or_else(|| anyhow!("{var} must be set when LLM_PROVIDER={}", self.llm_provider))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{name} must be a number, got {raw:?}: {e}"))
}
