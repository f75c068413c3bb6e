use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::enrich::MessageEnricher;
use crate::ingest;
use crate::models::RawMessage;

#[derive(Clone)]
pub struct AppState {
    pub enricher: Arc<MessageEnricher>,
    pub sample_data: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    messages: Option<Vec<RawMessage>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejecting malformed analyze request");
            return error_response(StatusCode::BAD_REQUEST, format!("invalid request body: {err}"));
        }
    };

    let messages = match request.messages {
        Some(messages) => messages,
        None => match ingest::load_csv(&state.sample_data) {
            Ok(messages) => messages,
            Err(err) => {
                error!(error = %err, "failed to load sample data");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"));
            }
        },
    };

    Json(state.enricher.analyze(&messages).await).into_response()
}

/// Empty bodies and falsy JSON (`null`, `[]`, `{}`, `""`, `0`, `false`) carry
/// no messages, which selects the sample dataset.
fn parse_request(body: &[u8]) -> Result<AnalyzeRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalyzeRequest::default());
    }

    let value: Value = serde_json::from_slice(body)?;
    if is_falsy(&value) {
        return Ok(AnalyzeRequest::default());
    }
    serde_json::from_value(value)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::intent::IntentClassifier;
    use crate::sentiment::{FixedModel, SentimentClassifier};

    fn state(sample_data: PathBuf) -> AppState {
        let sentiment =
            SentimentClassifier::new(Arc::new(FixedModel::new("POSITIVE", 0.9)), Duration::from_secs(5));
        AppState {
            enricher: Arc::new(MessageEnricher::new(sentiment, IntentClassifier::new().unwrap(), 4)),
            sample_data,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = health_check().await;
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn analyzes_posted_messages() {
        let body = Bytes::from(
            r#"{"messages": [{"sender": "alice", "text": "Please remind me to submit"}, {"sender": "bob", "text": "Thanks!"}]}"#,
        );
        let response = analyze(State(state(PathBuf::from("missing.csv"))), body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = body_json(response).await;
        assert_eq!(value["processed_messages"][0]["intent"], json!("reminder"));
        assert_eq!(value["scores"]["leaderboard"][0]["user"], json!("alice"));
        assert_eq!(value["scores"]["per_user"]["alice"]["score"], json!(100.0));
    }

    #[tokio::test]
    async fn empty_body_falls_back_to_sample_data() {
        let mut sample = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(sample, "message_id,sender,text,timestamp\n1,kiara,Let's sync tomorrow,2024-03-01").unwrap();

        let response = analyze(State(state(sample.path().to_path_buf())), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["processed_messages"][0]["sender"], json!("kiara"));
        assert_eq!(value["processed_messages"][0]["timestamp"], json!("2024-03-01 00:00:00"));
    }

    #[tokio::test]
    async fn missing_sample_data_is_a_server_error() {
        let response = analyze(State(state(PathBuf::from("does/not/exist.csv"))), Bytes::from("{}")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let response = analyze(State(state(PathBuf::from("missing.csv"))), Bytes::from("{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn sample_csv() -> tempfile::NamedTempFile {
        let mut sample = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(sample, "message_id,sender,text,timestamp\n1,kiara,Let's sync tomorrow,2024-03-01").unwrap();
        sample
    }

    #[tokio::test]
    async fn falsy_json_bodies_fall_back_to_sample_data() {
        let sample = sample_csv();
        for body in ["null", "[]", "{}", r#"{"messages": null}"#] {
            let response =
                analyze(State(state(sample.path().to_path_buf())), Bytes::from(body)).await;
            assert_eq!(response.status(), StatusCode::OK, "body {body}");
            let value = body_json(response).await;
            assert_eq!(value["processed_messages"][0]["sender"], json!("kiara"), "body {body}");
        }
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected() {
        let response = analyze(State(state(PathBuf::from("missing.csv"))), Bytes::from("[1, 2]")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn router_serves_analyze_and_health() {
        use axum::body::Body;
        use axum::http::{header, Request};
        use tower::ServiceExt;

        let app = create_router(state(PathBuf::from("missing.csv")));

        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"messages": [{"sender": "dana", "text": "Can we schedule a sync?"}]}"#,
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["processed_messages"][0]["intent"], json!("coordination"));
        assert_eq!(value["scores"]["leaderboard"][0]["user"], json!("dana"));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }
}
