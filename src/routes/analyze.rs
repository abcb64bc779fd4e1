use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::analysis::ResultBundle;
use crate::error::{AppError, AppResult};
use crate::report;

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    pub content: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeBody>, JsonRejection>,
) -> AppResult<Json<ResultBundle>> {
    let request = body(payload)?;
    let bundle = state.analyzer.analyze(&request.content).await;
    Ok(Json(bundle))
}

pub async fn report(
    State(state): State<AppState>,
    payload: Result<Json<ResultBundle>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let bundle = body(payload)?;
    let document = state.analyzer.renderer().render_blocking(bundle).await?;
    Ok(([(header::CONTENT_TYPE, report::CONTENT_TYPE)], document))
}

pub async fn analyze_report(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeBody>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let request = body(payload)?;
    let (_, document) = state.analyzer.analyze_and_render(&request.content).await?;

    Ok((
        [
            (header::CONTENT_TYPE, report::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report::FILENAME),
            ),
        ],
        document,
    ))
}
