use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use kv_intake::intake::{intake_router, SubmissionService, TabularSink};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) fn with_intake_routes<S>(
    service: Arc<SubmissionService<S>>,
    pdf_dir: PathBuf,
) -> axum::Router
where
    S: TabularSink + 'static,
{
    intake_router(service, pdf_dir)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::doubles::InMemorySink;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn test_router(sink: Arc<InMemorySink>) -> (axum::Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Arc::new(SubmissionService::new(sink, "KV"));
        (with_intake_routes(service, dir.path().join("applications")), dir)
    }

    async fn body_json(body: Body) -> Value {
        let bytes = to_bytes(body, usize::MAX).await.expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn submission_round_trips_through_the_router() {
        let sink = Arc::new(InMemorySink::default());
        let (router, _dir) = test_router(sink.clone());

        let request = Request::post("/api/v1/applications")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"Name":"Asha Rao","Mobile":"9999999999","Email":"a@x.com"}"#,
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response.into_body()).await;
        assert_eq!(body["status"], "saved");
        assert!(body["registration"]
            .as_str()
            .expect("registration")
            .starts_with("KV-"));
        assert_eq!(sink.row_count(), 1);
    }

    #[tokio::test]
    async fn validation_failure_is_a_bad_request() {
        let sink = Arc::new(InMemorySink::default());
        let (router, _dir) = test_router(sink.clone());

        let request = Request::post("/api/v1/applications")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"Name":"","Mobile":"123","Email":"a@x.com"}"#))
            .expect("request");

        let response = router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response.into_body()).await;
        assert_eq!(body["message"], "Name is required");
        assert_eq!(sink.row_count(), 0);
    }

    #[tokio::test]
    async fn home_route_serves_the_banner() {
        let sink = Arc::new(InMemorySink::default());
        let (router, _dir) = test_router(sink);

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&bytes[..], b"KV Application Intake Server Running");
    }
}
