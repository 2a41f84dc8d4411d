use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};

use super::export::WORKBOOK_CONTENT_TYPE;
use super::schema::REGISTRATION_FIELD;
use super::service::SubmissionService;
use super::sink::TabularSink;
use crate::pdf;

/// Shared handler state: the submission service plus the directory rendered
/// PDFs are persisted into.
pub struct IntakeState<S> {
    service: Arc<SubmissionService<S>>,
    pdf_dir: PathBuf,
}

/// Router builder exposing the intake HTTP surface.
pub fn intake_router<S>(service: Arc<SubmissionService<S>>, pdf_dir: PathBuf) -> Router
where
    S: TabularSink + 'static,
{
    let state = Arc::new(IntakeState { service, pdf_dir });
    Router::new()
        .route("/", get(home))
        .route(
            "/api/v1/applications",
            post(submit_handler::<S>).get(list_handler::<S>),
        )
        .route("/api/v1/applications/export", get(export_handler::<S>))
        .route("/api/v1/applications/pdf", post(pdf_handler::<S>))
        .with_state(state)
}

pub(crate) async fn home() -> &'static str {
    "KV Application Intake Server Running"
}

fn error_body(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "status": "error",
        "message": message,
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<S>(
    State(state): State<Arc<IntakeState<S>>>,
    axum::Json(payload): axum::Json<Map<String, Value>>,
) -> Response
where
    S: TabularSink + 'static,
{
    match state.service.submit(&payload) {
        Ok(receipt) => {
            let body = json!({
                "status": "saved",
                "registration": receipt.registration.0,
            });
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) if error.is_validation() => {
            error_body(StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(error) => error_body(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn list_handler<S>(State(state): State<Arc<IntakeState<S>>>) -> Response
where
    S: TabularSink + 'static,
{
    match state.service.list() {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => error_body(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn export_handler<S>(State(state): State<Arc<IntakeState<S>>>) -> Response
where
    S: TabularSink + 'static,
{
    match state.service.export() {
        Ok((filename, bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, WORKBOOK_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(error) => error_body(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn pdf_handler<S>(
    State(state): State<Arc<IntakeState<S>>>,
    axum::Json(payload): axum::Json<Map<String, Value>>,
) -> Response
where
    S: TabularSink + 'static,
{
    let registration = non_blank_str(&payload, REGISTRATION_FIELD).unwrap_or("TEMP");
    let name = non_blank_str(&payload, "Name").unwrap_or("Candidate");
    let filename = pdf::pdf_filename(registration, name);

    let rendered = match pdf::render(&payload) {
        Ok(rendered) => rendered,
        Err(error) => return error_body(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };

    let path = state.pdf_dir.join(&filename);
    let written = std::fs::create_dir_all(&state.pdf_dir)
        .and_then(|_| std::fs::write(&path, &rendered.bytes));
    if let Err(error) = written {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, error.to_string());
    }

    let body = json!({
        "status": "saved",
        "file": path.display().to_string(),
    });
    (StatusCode::OK, axum::Json(body)).into_response()
}

fn non_blank_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
