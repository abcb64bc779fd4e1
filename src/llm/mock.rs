//! Scripted generation backend for tests.
//!
//! Responses are keyed by [`GenerateRequest::stage`], so a test can make one
//! dimension fail, slow one down, or answer the summary differently.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::{GenerateRequest, GenerateResponse, Provider};

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    responses: HashMap<String, String>,
    fallback_response: Option<String>,
    failing: HashSet<String>,
    fail_all: bool,
    delay: Duration,
    stage_delays: HashMap<String, Duration>,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every stage that has no explicit response.
    pub fn answering_all(content: impl Into<String>) -> Self {
        Self {
            fallback_response: Some(content.into()),
            ..Self::default()
        }
    }

    /// Rejects every call, like a backend outage.
    pub fn outage() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn respond(mut self, stage: &str, content: impl Into<String>) -> Self {
        self.responses.insert(stage.to_string(), content.into());
        self
    }

    pub fn fail(mut self, stage: &str) -> Self {
        self.failing.insert(stage.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_stage_delay(mut self, stage: &str, delay: Duration) -> Self {
        self.stage_delays.insert(stage.to_string(), delay);
        self
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    fn record(&self, req: &GenerateRequest) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(req.clone());
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.record(req);

        let delay = self
            .stage_delays
            .get(&req.stage)
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all || self.failing.contains(&req.stage) {
            return Err(anyhow::anyhow!(
                "503 service unavailable: simulated outage for {}",
                req.stage
            ));
        }

        let content = self
            .responses
            .get(&req.stage)
            .or(self.fallback_response.as_ref())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no scripted response for stage {}", req.stage))?;

        Ok(GenerateResponse {
            output_tokens: content.split_whitespace().count() as u32,
            input_tokens: req
                .messages
                .iter()
                .map(|m| m.content.split_whitespace().count() as u32)
                .sum(),
            content,
            model: req.model.clone(),
            finish_reason: "stop".to_string(),
            provider: "mock".to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
