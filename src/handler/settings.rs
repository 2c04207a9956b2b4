use std::sync::Arc;

use axum::{Json, Router, body::Bytes, extract::State, routing::get};
use panel_db::settings::{ClientSettings, DeviceSettingsUpdate};
use serde::Serialize;

use crate::{error::PanelError, handler::ApiJsonResult, state::AppState};

pub fn settings_router() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings).post(update_settings))
}

async fn get_settings(State(state): State<Arc<AppState>>) -> ApiJsonResult<ClientSettings> {
    Ok(Json(state.load_settings().await?))
}

#[derive(Serialize)]
pub struct SettingsUpdated {
    settings: ClientSettings,
    /// Whether delivery to the device was queued. Delivery itself is not awaited.
    push_queued: bool,
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiJsonResult<SettingsUpdated> {
    let update: DeviceSettingsUpdate = serde_json::from_slice(&body)
        .map_err(|e| PanelError::invalid(format!("invalid settings: {}", e)))?;
    let (settings, push_queued) = state.update_settings(&update).await?;
    Ok(Json(SettingsUpdated {
        settings,
        push_queued,
    }))
}
