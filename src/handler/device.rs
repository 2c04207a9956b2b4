use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    routing::{get, post},
};
use panel_db::settings::DeviceSettings;
use serde::Serialize;

use crate::{handler::ApiJsonResult, state::AppState, sync::pusher::PushOutcome};

/// Endpoints the device itself calls.
pub fn device_router() -> Router<Arc<AppState>> {
    Router::new().route("/device/config", get(config))
}

/// Operator-side control of the device.
pub fn device_control_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/device/files", get(list_files))
        .route("/device/stop", post(stop))
}

/// The device's settings. Asking for them counts as a heartbeat from the caller.
async fn config(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> ApiJsonResult<DeviceSettings> {
    state.record_poll(peer.ip()).await;
    let record = state.load_settings().await?;
    Ok(Json(record.device))
}

#[derive(Serialize)]
pub struct DeviceFiles {
    address: String,
    files: Vec<String>,
}

async fn list_files(State(state): State<Arc<AppState>>) -> ApiJsonResult<DeviceFiles> {
    let address = state.device_address().await;
    let files = state.pusher.list_files(address.as_deref()).await?;
    Ok(Json(DeviceFiles {
        address: address.unwrap_or_default(),
        files,
    }))
}

async fn stop(State(state): State<Arc<AppState>>) -> Json<PushOutcome> {
    let address = state.device_address().await;
    Json(state.pusher.stop(address.as_deref()).await)
}
