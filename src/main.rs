use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;

use privacy_prism::AppState;
use privacy_prism::analysis::{Analyzer, GenerationSettings};
use privacy_prism::config::Config;
use privacy_prism::llm::{self, LlmClient};
use privacy_prism::report::ReportRenderer;
use privacy_prism::routes;
use privacy_prism::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting privacy-prism"
    );

    let api_key = config.provider_api_key()?;
    let (provider, endpoint): (Arc<dyn llm::Provider>, &str) = match config.llm_provider.as_str() {
        "anthropic" => {
            let provider: Arc<dyn llm::Provider> =
                Arc::new(llm::anthropic::AnthropicProvider::new(api_key));
            (provider, llm::anthropic::MESSAGES_URL)
        }
        _ => {
            let provider: Arc<dyn llm::Provider> = Arc::new(llm::openai::OpenAIProvider::new(
                api_key,
                &config.openai_base_url,
            ));
            (provider, config.openai_base_url.as_str())
        }
    };

    let llm_client = Arc::new(LlmClient::new(
        provider,
        endpoint,
        Duration::from_secs(config.llm_timeout_secs),
    ));

    tracing::info!(
        provider = %llm_client.provider_name(),
        default_model = %config.default_model,
        summary_model = %config.summary_model,
        timeout_secs = config.llm_timeout_secs,
        "LLM client initialized"
    );

    let analyzer = Analyzer::new(llm_client, GenerationSettings::from_config(&config))
        .with_renderer(ReportRenderer::from_font_path(config.report_font_path()));
    let app = routes::router(AppState::new(analyzer));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
