use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{GenerateRequest, GenerateResponse, Provider, Role};
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
};

/// Process-wide handle to the generation backend, shared read-only by every
/// concurrent worker.
pub struct LlmClient {
    provider: Arc<dyn Provider>,
    server_address: String,
    server_port: i64,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, endpoint: &str, timeout: Duration) -> Self {
        let (server_address, server_port) = server_endpoint(endpoint);
        Self {
            provider,
            server_address,
            server_port,
            timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %self.server_address,
            server.port = self.server_port,
            gen_ai.request.temperature = req.temperature,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            analysis.stage = %req.stage,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        {
            let mut user_event_attrs = Vec::new();
            for message in &req.messages {
                match message.role {
                    Role::System => user_event_attrs.push(KeyValue::new(
                        "gen_ai.system_instructions",
                        truncate(&message.content, 500),
                    )),
                    Role::User => user_event_attrs.push(KeyValue::new(
                        "gen_ai.prompt",
                        truncate(&message.content, 1000),
                    )),
                }
            }
            span.add_event("gen_ai.user.message", user_event_attrs);
        }

        let result = match tokio::time::timeout(
            self.timeout,
            self.provider.generate(req).instrument(span.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "request timed out after {:?}",
                self.timeout
            )),
        };

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(mut resp) => {
                resp.provider = provider_name.clone();

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
                let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name);
                let model_kv = KeyValue::new("gen_ai.request.model", req.model.clone());

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                let error_type = classify_error(&err);
                span.record("otel.status_code", "ERROR");
                span.record("error.type", error_type);

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name.clone()),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                        KeyValue::new("error.type", error_type),
                    ],
                );

                tracing::warn!(
                    provider = %provider_name,
                    model = %req.model,
                    stage = %req.stage,
                    error.type = error_type,
                    error = %err,
                    "LLM call failed"
                );

                Err(err)
            }
        }
    }
}

/// Host and port for span attributes, derived from the provider's base URL.
fn server_endpoint(endpoint: &str) -> (String, i64) {
    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("https", endpoint),
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let default_port = if scheme == "http" { 80 } else { 443 };

    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (authority.to_string(), default_port),
        },
        None => (authority.to_string(), default_port),
    }
}

pub(crate) fn classify_error(err: &anyhow::Error) -> &'static str {
    let msg = err.to_string().to_lowercase();
    if msg.contains("rate limit") || msg.contains("429") {
        "rate_limit"
    } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        "timeout"
    } else if msg.contains("401")
        || msg.contains("403")
        || msg.contains("auth")
        || msg.contains("api key")
    {
        "auth_error"
    } else if msg.contains("400") || msg.contains("422") || msg.contains("invalid") {
        "invalid_request"
    } else if msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("server")
    {
        "server_error"
    } else if msg.contains("connect")
        || msg.contains("dns")
        || msg.contains("network")
        || msg.contains("reset")
    {
        "network_error"
    } else {
        "unknown_error"
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use crate::llm::mock::ScriptedProvider;

    fn request(stage: &str) -> GenerateRequest {
        GenerateRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::system("frame"), ChatMessage::user("body")],
            temperature: 0.6,
            max_tokens: 100,
            stage: stage.to_string(),
        }
    }

    #[test]
    fn test_classify_error_categories() {
        let cases = vec![
            ("rate limit exceeded", "rate_limit"),
            ("status 429: too many requests", "rate_limit"),
            ("context deadline exceeded: timeout", "timeout"),
            ("request timed out after 90s", "timeout"),
            ("401 unauthorized", "auth_error"),
            ("403 forbidden", "auth_error"),
            ("invalid api key", "auth_error"),
            ("400 bad request", "invalid_request"),
            ("422 unprocessable entity", "invalid_request"),
            ("500 internal server error", "server_error"),
            ("503 service unavailable", "server_error"),
            ("connection refused", "network_error"),
            ("dns resolution failed", "network_error"),
            ("something unexpected", "unknown_error"),
        ];

        for (msg, expected) in cases {
            let err = anyhow::anyhow!("{}", msg);
            assert_eq!(
                classify_error(&err),
                expected,
                "classify_error({msg:?}) should be {expected:?}"
            );
        }
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("hé世界!", 3);
        assert!(result.len() <= 3);
        assert_eq!(result, "hé");
    }

    #[test]
    fn test_server_endpoint() {
        assert_eq!(
            server_endpoint("https://api.moonshot.cn/v1"),
            ("api.moonshot.cn".to_string(), 443)
        );
        assert_eq!(
            server_endpoint("http://localhost:11434/v1"),
            ("localhost".to_string(), 11434)
        );
        assert_eq!(
            server_endpoint("api.anthropic.com"),
            ("api.anthropic.com".to_string(), 443)
        );
    }

    #[tokio::test]
    async fn test_generate_stamps_provider_name() {
        let provider = Arc::new(ScriptedProvider::new().respond("exposure", "looks risky"));
        let client = LlmClient::new(provider, "https://example.test", Duration::from_secs(5));

        let resp = client.generate(&request("exposure")).await.unwrap();
        assert_eq!(resp.content, "looks risky");
        assert_eq!(resp.provider, "mock");
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .respond("exposure", "too late")
                .with_delay(Duration::from_millis(500)),
        );
        let client = LlmClient::new(provider, "https://example.test", Duration::from_millis(50));

        let err = client.generate(&request("exposure")).await.unwrap_err();
        assert_eq!(err.to_string(), "request timed out after 50ms");
        assert_eq!(classify_error(&err), "timeout");
    }
}
