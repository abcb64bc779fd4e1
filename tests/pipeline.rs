use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use tower::ServiceExt;

use privacy_prism::AppState;
use privacy_prism::analysis::{
    Analyzer, Dimension, DimensionOutcome, GenerationSettings, ResultBundle,
};
use privacy_prism::llm::LlmClient;
use privacy_prism::llm::mock::ScriptedProvider;
use privacy_prism::report;
use privacy_prism::routes::router;

const SUBMISSION: &str = "My name is Alex and I live at 123 Oak St";

fn analyzer(provider: Arc<ScriptedProvider>) -> Analyzer {
    let llm = Arc::new(LlmClient::new(
        provider,
        "https://api.moonshot.cn/v1",
        Duration::from_secs(5),
    ));
    Analyzer::new(llm, GenerationSettings::uniform("kimi-k2-turbo-preview"))
}

fn healthy_backend() -> Arc<ScriptedProvider> {
    let mut provider = ScriptedProvider::new();
    for dimension in Dimension::ALL {
        provider = provider.respond(
            dimension.key(),
            format!("{} findings. Risk Verdict: Medium", dimension.label()),
        );
    }
    Arc::new(provider.respond("summary", "Overall posture: Medium. Act on the address first."))
}

fn pdf_text(document: &[u8]) -> String {
    String::from_utf8_lossy(document).into_owned()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn full_run_produces_six_results_summary_and_report() {
    let provider = healthy_backend();
    let bundle = analyzer(provider.clone()).analyze(SUBMISSION).await;

    assert_eq!(bundle.dimensions.success_count(), 6);
    for (dimension, outcome) in bundle.dimensions.iter() {
        match outcome {
            DimensionOutcome::Success { text } => assert!(text.starts_with(dimension.label())),
            other => panic!("{dimension} failed: {other:?}"),
        }
    }
    assert!(bundle.summary.is_some());
    assert_eq!(provider.call_count(), 7);

    let document = assert_ok!(report::render(&bundle));
    let pdf = pdf_text(&document);
    assert!(pdf.starts_with("%PDF-"));
    assert!(pdf.contains("/Count 8"));
    assert!(pdf.contains("(Executive Summary) Tj"));
}

#[tokio::test]
async fn every_worker_receives_the_submission() {
    let provider = healthy_backend();
    analyzer(provider.clone()).analyze(SUBMISSION).await;

    let calls = provider.calls();
    for dimension in Dimension::ALL {
        let call = calls.iter().find(|c| c.stage == dimension.key()).unwrap();
        assert!(call.messages[1].content.contains(SUBMISSION));
    }
}

#[tokio::test]
async fn empty_submission_still_runs_every_dimension() {
    let provider = Arc::new(ScriptedProvider::answering_all("Nothing to analyse."));
    let bundle = analyzer(provider.clone()).analyze("").await;

    assert_eq!(bundle.dimensions.iter().count(), 6);
    assert_eq!(provider.call_count(), 7);
    assert_eq!(bundle.submission, "");
}

#[tokio::test]
async fn backend_outage_degrades_to_placeholders() {
    let provider = Arc::new(ScriptedProvider::outage());
    let bundle = analyzer(provider).analyze(SUBMISSION).await;

    assert_eq!(bundle.dimensions.failure_count(), 6);
    assert!(bundle.summary.is_none());

    let document = assert_ok!(report::render(&bundle));
    let pdf = pdf_text(&document);
    assert!(pdf.contains("/Count 7"));
    assert_eq!(pdf.matches("(No analysis available) Tj").count(), 6);
}

#[tokio::test]
async fn one_failing_dimension_does_not_affect_the_others() {
    let provider = Arc::new(
        ScriptedProvider::answering_all("fine")
            .fail("platforms")
            .respond("summary", "summary"),
    );
    let bundle = analyzer(provider).analyze(SUBMISSION).await;

    assert_eq!(bundle.dimensions.success_count(), 5);
    assert!(!bundle.dimensions.get(Dimension::Platforms).is_success());
    assert_eq!(bundle.summary.as_deref(), Some("summary"));
}

#[tokio::test]
async fn workers_run_concurrently() {
    let provider = Arc::new(
        ScriptedProvider::answering_all("slow").with_delay(Duration::from_millis(200)),
    );
    let start = std::time::Instant::now();
    analyzer(provider).analyze(SUBMISSION).await;

    // Six sequential dimension calls plus the summary would take at least 1.4s.
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn bundle_json_round_trips_through_report_route() {
    let bundle = analyzer(healthy_backend()).analyze(SUBMISSION).await;
    let json = serde_json::to_value(&bundle).unwrap();

    let parsed: ResultBundle = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(parsed.id, bundle.id);
    assert_eq!(parsed.dimensions, bundle.dimensions);

    let app = router(AppState::new(analyzer(healthy_backend())));
    let response = app.oneshot(post_json("/api/report", json)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        report::CONTENT_TYPE
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn health_route_reports_ok() {
    let app = router(AppState::new(analyzer(healthy_backend())));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "privacy-prism");
}

#[tokio::test]
async fn analyze_route_returns_bundle() {
    let app = router(AppState::new(analyzer(healthy_backend())));
    let response = app
        .oneshot(post_json("/api/analyze", json!({ "content": SUBMISSION })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["submission"], SUBMISSION);
    assert_eq!(body["dimensions"].as_array().map(Vec::len), Some(6));
    assert_eq!(body["dimensions"][0]["dimension"], "exposure");
    assert_eq!(body["dimensions"][0]["outcome"]["status"], "success");
    assert!(body["summary"].is_string());
}

#[tokio::test]
async fn analyze_route_rejects_missing_content() {
    let app = router(AppState::new(analyzer(healthy_backend())));
    let response = app
        .oneshot(post_json("/api/analyze", json!({ "text": SUBMISSION })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("content"));
}

#[tokio::test]
async fn report_route_rejects_incomplete_bundle() {
    let app = router(AppState::new(analyzer(healthy_backend())));
    let bundle = json!({
        "submission": SUBMISSION,
        "dimensions": [
            { "dimension": "exposure", "outcome": { "status": "success", "text": "ok" } }
        ]
    });
    let response = app.oneshot(post_json("/api/report", bundle)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyze_report_route_returns_attachment() {
    let app = router(AppState::new(analyzer(Arc::new(ScriptedProvider::outage()))));
    let response = app
        .oneshot(post_json("/api/analyze/report", json!({ "content": SUBMISSION })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"privacy-prism-report.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let pdf = pdf_text(&bytes);
    assert!(pdf.contains("(No analysis available) Tj"));
}

#[test]
fn unknown_dimension_keys_are_rejected() {
    assert_err!(privacy_prism::analysis::lookup("virality"));
    assert_ok!(privacy_prism::analysis::lookup("exposure"));
}
