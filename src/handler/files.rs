use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{delete, get, post},
};
use serde::Serialize;

use crate::{
    error::PanelError,
    handler::{ApiJsonResult, form::Form},
    library,
    state::AppState,
    sync::pusher::PushOutcome,
};

pub fn files_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/{name}", delete(delete_file))
        .route("/files/{name}/play", post(play_file))
}

async fn list_files(State(state): State<Arc<AppState>>) -> ApiJsonResult<Vec<String>> {
    Ok(Json(state.library.list().await?))
}

#[derive(Serialize)]
pub struct FileUploaded {
    name: String,
    size: usize,
    push: PushOutcome,
}

/// Stores the file locally, replacing one of the same name, then mirrors it to
/// the device.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiJsonResult<FileUploaded> {
    let mut form = Form::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| PanelError::invalid("file required"))?;
    let name = library::validate_name(&file.filename)?.to_string();

    state.library.save(&name, &file.bytes).await?;

    let size = file.bytes.len();
    let address = state.device_address().await;
    let push = state
        .pusher
        .upload_file(address.as_deref(), &name, file.bytes)
        .await;
    Ok(Json(FileUploaded { name, size, push }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteSummary {
    Both,
    LocalOnly,
    RemoteOnly,
    Neither,
}

impl DeleteSummary {
    pub fn of(local: bool, remote: bool) -> Self {
        match (local, remote) {
            (true, true) => DeleteSummary::Both,
            (true, false) => DeleteSummary::LocalOnly,
            (false, true) => DeleteSummary::RemoteOnly,
            (false, false) => DeleteSummary::Neither,
        }
    }
}

#[derive(Serialize)]
pub struct FileDeleted {
    local: bool,
    /// Set when the local delete failed; `local` is then false.
    #[serde(skip_serializing_if = "Option::is_none")]
    local_error: Option<String>,
    remote: PushOutcome,
    summary: DeleteSummary,
}

/// The two stores fail independently, so each side is reported on its own.
async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiJsonResult<FileDeleted> {
    let name = library::validate_name(&name)?;
    let (local, local_error) = match state.library.delete(name).await {
        Ok(removed) => (removed, None),
        Err(e) => {
            log::warn!("delete {}: local delete failed: {:#}", name, e);
            (false, Some(format!("{:#}", e)))
        }
    };

    let address = state.device_address().await;
    let remote = state.pusher.delete_file(address.as_deref(), name).await;
    let summary = DeleteSummary::of(local, remote.is_delivered());
    log::info!("delete {}: {:?}", name, summary);
    Ok(Json(FileDeleted {
        local,
        local_error,
        remote,
        summary,
    }))
}

async fn play_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiJsonResult<PushOutcome> {
    let name = library::validate_name(&name)?;
    if !state.library.contains(name).await? {
        return Err(PanelError::NotFound(format!("file {:?}", name)).into());
    }
    let address = state.device_address().await;
    Ok(Json(state.pusher.play_file(address.as_deref(), name).await))
}
