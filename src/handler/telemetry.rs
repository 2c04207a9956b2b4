use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, State},
    routing::post,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{error::PanelError, handler::ApiJsonResult, state::AppState};

pub fn telemetry_router() -> Router<Arc<AppState>> {
    Router::new().route("/telemetry", post(report).get(current))
}

#[derive(Serialize)]
pub struct TelemetryView {
    snapshot: Option<Map<String, Value>>,
    age_secs: Option<f64>,
}

async fn report(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> ApiJsonResult<Value> {
    let snapshot = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(snapshot)) => snapshot,
        Ok(_) => return Err(PanelError::invalid("telemetry must be a JSON object").into()),
        Err(e) => return Err(PanelError::invalid(format!("invalid telemetry: {}", e)).into()),
    };
    let heartbeat = state.record_telemetry(snapshot, Some(peer.ip())).await;
    log::debug!("telemetry from {}: {} fields", peer, heartbeat.snapshot.len());
    Ok(Json(serde_json::json!({ "status": "success" })))
}

async fn current(State(state): State<Arc<AppState>>) -> ApiJsonResult<TelemetryView> {
    let heartbeat = state.heartbeat.current().await;
    let age = state.heartbeat.age().await;
    Ok(Json(TelemetryView {
        snapshot: heartbeat.map(|hb| hb.snapshot),
        age_secs: age.map(|age| age.as_secs_f64()),
    }))
}
