use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::{
    handler::{ApiJsonResult, ApiResult},
    media,
    panel::{PanelId, PanelStatus},
    state::AppState,
    sync::queue::SyncCounters,
};

pub fn panel_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/panel/{id}", get(read_panel))
        .route("/status", get(status))
}

/// Current frame as PNG. Each call marks the panel as read.
async fn read_panel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: PanelId = id.parse()?;
    let frame = state.panels.read(id).await;
    let png = tokio::task::spawn_blocking(move || media::encode_png(&frame)).await??;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    ))
}

#[derive(Serialize)]
struct DeviceStatus {
    address: Option<String>,
    telemetry_age_secs: Option<f64>,
}

#[derive(Serialize)]
struct StatusResponse {
    panels: Vec<PanelStatus>,
    device: DeviceStatus,
    sync: SyncCounters,
}

async fn status(State(state): State<Arc<AppState>>) -> ApiJsonResult<StatusResponse> {
    let now = Instant::now();
    let mut panels = Vec::with_capacity(PanelId::ALL.len());
    for id in PanelId::ALL {
        panels.push(state.panels.status_at(id, now).await);
    }
    let device = DeviceStatus {
        address: state.device_address().await,
        telemetry_age_secs: state.heartbeat.age_at(now).await.map(|age| age.as_secs_f64()),
    };
    Ok(Json(StatusResponse {
        panels,
        device,
        sync: state.sync.counters(),
    }))
}
