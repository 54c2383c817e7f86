//! HTTP routes and handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::assets;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/", get(discover_root))
        .route("/ping", get(ping))
        .route("/predict", post(post_predict))
        .route("/predict/:words", get(get_predict))
        .route("/model", get(model_schema))
        .route("/metrics", get(metrics))
        .fallback(assets::serve_static)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins.iter().cloned()))
    }
}

async fn ping() -> StatusCode {
    StatusCode::OK
}

/// Advertise the service's resources through `Link` headers
async fn discover_root(headers: HeaderMap) -> Response {
    let root = headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .map(|host| format!("http://{}/", host))
        .unwrap_or_else(|| "/".to_string());

    let mut response = StatusCode::NO_CONTENT.into_response();
    for (resource, rel) in [("index.html", "index"), ("predict", "restconf")] {
        let link = link_header(&format!("{}{}", root, resource), rel);
        match HeaderValue::from_str(&link) {
            Ok(value) => {
                response.headers_mut().append(header::LINK, value);
            }
            Err(_) => warn!("Skipping unrepresentable link header: {}", link),
        }
    }
    response
}

fn link_header(uri: &str, rel: &str) -> String {
    format!("<{}>; rel=\"{}\"", uri, rel)
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    words: String,
}

/// Prediction response body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub result: String,
    pub confidence: f64,
}

async fn post_predict(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<PredictResponse>, AppError> {
    let request: PredictRequest = serde_json::from_str(&body)?;
    predict(&state, &request.words)
}

async fn get_predict(
    State(state): State<AppState>,
    Path(words): Path<String>,
) -> Result<Json<PredictResponse>, AppError> {
    predict(&state, &words)
}

/// Run the pipeline; it is synchronous and in-memory, so it runs inline
fn predict(state: &AppState, words: &str) -> Result<Json<PredictResponse>, AppError> {
    let started = Instant::now();
    metrics::counter!("docclass_requests_total").increment(1);

    match state.predictor.predict(words) {
        Ok(prediction) => {
            metrics::histogram!("docclass_predict_latency_us")
                .record(started.elapsed().as_micros() as f64);
            metrics::counter!("docclass_predictions_total", "label" => prediction.label.clone())
                .increment(1);

            Ok(Json(PredictResponse {
                result: prediction.label,
                confidence: prediction.confidence,
            }))
        }
        Err(e) => {
            metrics::counter!("docclass_errors_total", "kind" => e.kind()).increment(1);
            if e.is_client_error() {
                warn!(kind = e.kind(), "Prediction rejected: {}", e);
            } else {
                error!(kind = e.kind(), "Prediction failed: {}", e);
            }
            Err(AppError::Prediction(e))
        }
    }
}

/// Describe the loaded model's schema
async fn model_schema(State(state): State<AppState>) -> Json<serde_json::Value> {
    let handle = state.predictor.handle();
    Json(json!({
        "model": handle.info(),
        "input_fields": handle.input_fields(),
        "target_fields": handle.target_fields(),
        "predicted_target": state.predictor.target(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics are disabled").into_response(),
    }
}

/// Error handling
#[derive(Debug)]
enum AppError {
    InvalidRequest(String),
    Prediction(docclass_core::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, kind) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg, "invalid_request_error"),
            AppError::Prediction(err) => {
                let status = if err.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                // Evaluation errors may name derived fields; keep those in the logs
                let message = match &err {
                    docclass_core::Error::Evaluation { .. } => "model evaluation failed".to_string(),
                    other => other.to_string(),
                };
                (status, message, err.kind())
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_header_format() {
        assert_eq!(
            link_header("http://localhost:8080/predict", "restconf"),
            "<http://localhost:8080/predict>; rel=\"restconf\""
        );
    }

    #[test]
    fn test_field_preparation_error_is_bad_request() {
        let err = AppError::Prediction(docclass_core::Error::field_preparation("n", "x", "bad"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_decode_error_is_server_error() {
        let err = AppError::Prediction(docclass_core::Error::decode("y", "label missing"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
