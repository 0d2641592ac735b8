//! Inbound webhook ingestion.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};
use unibridge_connect::{WebhookHeaders, WebhookOutcome};
use unibridge_core::constants::{PLATFORM_AIRBNB, PLATFORM_MAERSK, PLATFORM_VINTED};

use crate::main_lib::AppState;

/// Where a platform puts the event type of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTypeSource {
    Header(&'static str),
    BodyField(&'static str),
}

pub fn event_type_source(platform_id: &str) -> Option<EventTypeSource> {
    match platform_id {
        PLATFORM_VINTED => Some(EventTypeSource::Header("x-vinted-event")),
        PLATFORM_MAERSK => Some(EventTypeSource::BodyField("eventType")),
        PLATFORM_AIRBNB => Some(EventTypeSource::BodyField("event_type")),
        _ => None,
    }
}

fn extract_event_type(platform_id: &str, headers: &WebhookHeaders, payload: &Value) -> Option<String> {
    let value = match event_type_source(platform_id)? {
        EventTypeSource::Header(name) => headers.get(name).map(String::as_str),
        EventTypeSource::BodyField(field) => payload.get(field).and_then(Value::as_str),
    };
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn lowercase_headers(headers: &HeaderMap) -> WebhookHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

#[derive(Debug)]
enum WebhookRejection {
    RateLimited,
    UnknownAdapter(String),
    InvalidSignature,
    MissingEventType,
    MalformedBody(String),
    Failed(String),
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            WebhookRejection::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests",
                "Webhook rate limit exceeded, retry later".to_string(),
            ),
            WebhookRejection::UnknownAdapter(platform) => (
                StatusCode::NOT_FOUND,
                "Adapter not found",
                format!("No adapter registered for {}", platform),
            ),
            WebhookRejection::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "Invalid signature",
                "Webhook signature verification failed".to_string(),
            ),
            WebhookRejection::MissingEventType => (
                StatusCode::BAD_REQUEST,
                "Missing event type",
                "Could not determine the webhook event type".to_string(),
            ),
            WebhookRejection::MalformedBody(reason) => {
                (StatusCode::BAD_REQUEST, "Malformed body", reason)
            }
            WebhookRejection::Failed(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook processing failed",
                reason,
            ),
        };
        let body = Json(json!({ "success": false, "error": error, "message": message }));
        (status, body).into_response()
    }
}

fn accepted(outcome: WebhookOutcome) -> Response {
    let mut body = match serde_json::to_value(&outcome) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    body.insert("success".to_string(), Value::Bool(true));
    body.insert("processed".to_string(), Value::Bool(outcome.processed));
    (StatusCode::OK, Json(Value::Object(body))).into_response()
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookRejection> {
    if !state.webhook_limiter.try_acquire() {
        warn!("[{}] webhook rejected by rate limit", platform);
        return Err(WebhookRejection::RateLimited);
    }

    let adapter = state
        .orchestrator
        .get_adapter(&platform)
        .ok_or_else(|| WebhookRejection::UnknownAdapter(platform.clone()))?;

    let headers = lowercase_headers(&headers);
    if !adapter.validate_webhook_signature(&headers, &body) {
        warn!("[{}] webhook signature rejected", platform);
        return Err(WebhookRejection::InvalidSignature);
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| WebhookRejection::MalformedBody(format!("Invalid JSON body: {}", e)))?;
    let event_type =
        extract_event_type(&platform, &headers, &payload).ok_or(WebhookRejection::MissingEventType)?;
    debug!("[{}] webhook {} received", platform, event_type);

    match state
        .orchestrator
        .process_webhook(&platform, &event_type, payload)
        .await
    {
        Ok(outcome) => Ok(accepted(outcome)),
        Err(e) => {
            error!("[{}] webhook {} failed: {}", platform, event_type, e);
            Err(WebhookRejection::Failed(e.to_string()))
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/{platform}", post(receive_webhook))
}
