use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use futures_core::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use unibridge_connect::{
    AdapterConfig, AdapterInfo, BridgeHealth, BridgeStats, Outcome, PlatformAdapter,
    PlatformSyncResult, SyncOptions, SyncReport, TrackingSnapshot,
};
use unibridge_core::items::ItemRepositoryTrait;
use unibridge_core::orders::OrderRepositoryTrait;
use unibridge_core::shipments::ShipmentRepositoryTrait;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    scheduler::JobStatus,
};

/// Rejects the request unless it carries the admin bearer token. Open when
/// no token is configured.
fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match provided {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("Invalid admin token".to_string())),
        None => Err(ApiError::Unauthorized("Admin token required".to_string())),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredCounts {
    items: usize,
    orders: usize,
    shipments: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BridgeStatus {
    #[serde(flatten)]
    stats: BridgeStats,
    platforms: Vec<String>,
    stored: StoredCounts,
}

async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<BridgeStatus>> {
    let store = &state.store;
    let stored = StoredCounts {
        items: store.count_items(None)?,
        orders: store.count_orders(None)?,
        shipments: store.count_shipments(None)?,
    };
    Ok(Json(BridgeStatus {
        stats: state.orchestrator.get_stats(),
        platforms: state.orchestrator.platform_ids(),
        stored,
    }))
}

async fn list_adapters(State(state): State<Arc<AppState>>) -> Json<Vec<AdapterInfo>> {
    Json(state.orchestrator.list_adapters())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterAdapterRequest {
    platform_id: String,
    #[serde(default)]
    config: AdapterConfig,
}

async fn register_adapter(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RegisterAdapterRequest>,
) -> ApiResult<(StatusCode, Json<AdapterInfo>)> {
    require_admin(&state, &headers)?;
    let adapter = state.factory.create(&body.platform_id, body.config)?;
    let mode = adapter.connect().await?;
    tracing::info!("[{}] registered via API ({:?} mode)", adapter.platform_id(), mode);

    let info = adapter.info();
    state
        .orchestrator
        .register_adapter(adapter.platform_id(), adapter);
    Ok((StatusCode::CREATED, Json(info)))
}

async fn unregister_adapter(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(platform): Path<String>,
) -> ApiResult<StatusCode> {
    require_admin(&state, &headers)?;
    state.orchestrator.unregister_adapter(&platform).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SyncQuery {
    limit: Option<usize>,
}

impl SyncQuery {
    fn options(&self) -> SyncOptions {
        SyncOptions { limit: self.limit }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncAllResponse {
    success: bool,
    results: Vec<PlatformSyncResult>,
}

async fn sync_all(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SyncQuery>,
) -> Json<SyncAllResponse> {
    let results = state.scheduler.trigger_sync(None, query.options()).await;
    Json(SyncAllResponse {
        success: results.iter().all(|r| r.success),
        results,
    })
}

async fn sync_platform(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Query(query): Query<SyncQuery>,
) -> ApiResult<Json<Outcome<SyncReport>>> {
    let outcome = state
        .orchestrator
        .sync_inventory(&platform, query.options())
        .await?;
    Ok(Json(outcome))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobStatus>> {
    Json(state.scheduler.job_statuses())
}

#[derive(Deserialize)]
struct TrackingQuery {
    platform: Option<String>,
}

async fn track_shipment(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
    Query(query): Query<TrackingQuery>,
) -> ApiResult<Json<Outcome<TrackingSnapshot>>> {
    let outcome = state
        .orchestrator
        .track_shipment(&tracking_number, query.platform.as_deref())
        .await?;
    Ok(Json(outcome))
}

async fn bridge_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<BridgeHealth>) {
    let health = state.orchestrator.health_check().await;
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = BroadcastStream::new(state.event_bus.subscribe());
    let stream = tokio_stream::StreamExt::filter_map(receiver, |event| match event {
        Ok(evt) => {
            let sse_event = SseEvent::default().event(evt.name);
            let sse_event = if let Some(payload) = evt.payload {
                match sse_event.json_data(payload) {
                    Ok(ev) => ev,
                    Err(err) => {
                        tracing::error!(
                            "Failed to serialize SSE payload for {}: {}",
                            evt.name,
                            err
                        );
                        return None;
                    }
                }
            } else {
                sse_event.data("null")
            };
            Some(Ok(sse_event))
        }
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bridge/status", get(get_status))
        .route("/bridge/adapters", get(list_adapters).post(register_adapter))
        .route("/bridge/adapters/{platform}", delete(unregister_adapter))
        .route("/bridge/sync", post(sync_all))
        .route("/bridge/sync/{platform}", post(sync_platform))
        .route("/bridge/jobs", get(list_jobs))
        .route("/bridge/tracking/{tracking_number}", get(track_shipment))
        .route("/bridge/health", get(bridge_health))
        .route("/bridge/events/stream", get(stream_events))
}
