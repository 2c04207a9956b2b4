use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Query, State},
    routing::post,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use serde::{Deserialize, Serialize};

use crate::{
    error::PanelError,
    handler::{
        ApiJsonResult,
        form::{Form, FormFile},
    },
    media::{FrameSize, compositor, decode},
    panel::{PanelId, PanelTarget},
    state::AppState,
    sync::pusher::{ContentFile, PushOutcome},
};

pub fn content_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/draw", post(draw))
        .route("/upload", post(upload))
        .route("/clear", post(clear))
}

/// How uploaded media is routed onto the panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    PanelA,
    PanelB,
    /// The same content on both panels.
    Both,
    /// One double-width source, left half on A and right half on B.
    Split,
    /// `file_a` on A, `file_b` on B.
    Separate,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadMode::PanelA => "panel_a",
            UploadMode::PanelB => "panel_b",
            UploadMode::Both => "both",
            UploadMode::Split => "split",
            UploadMode::Separate => "separate",
        }
    }

    fn decode_size(&self) -> FrameSize {
        match self {
            UploadMode::Split => FrameSize::SPLIT,
            _ => FrameSize::PANEL,
        }
    }
}

impl FromStr for UploadMode {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "panel_a" | "matrix_a" => Ok(UploadMode::PanelA),
            "panel_b" | "matrix_b" => Ok(UploadMode::PanelB),
            "both" => Ok(UploadMode::Both),
            "split" => Ok(UploadMode::Split),
            "separate" => Ok(UploadMode::Separate),
            _ => Err(PanelError::invalid(format!("invalid mode {:?}", s))),
        }
    }
}

#[derive(Serialize)]
pub struct ContentResponse {
    status: &'static str,
    message: String,
    push: PushOutcome,
}

#[derive(Deserialize)]
struct DrawRequest {
    image: Option<String>,
}

/// Decodes a base64 raster, with or without a `data:...;base64,` prefix.
pub fn decode_draw_payload(image: &str) -> Result<Vec<u8>, PanelError> {
    let payload = match image.split_once(',') {
        Some((_, data)) => data,
        None => image,
    };
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(PanelError::invalid("no image data provided"));
    }
    BASE64_ENGINE
        .decode(payload.as_bytes())
        .map_err(|e| PanelError::invalid(format!("image is not valid base64: {}", e)))
}

/// A drawing always spans both panels.
async fn draw(State(state): State<Arc<AppState>>, body: Bytes) -> ApiJsonResult<ContentResponse> {
    let request: DrawRequest = serde_json::from_slice(&body)
        .map_err(|e| PanelError::invalid(format!("invalid draw request: {}", e)))?;
    let image = request
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| PanelError::invalid("no image data provided"))?;
    let bytes = Bytes::from(decode_draw_payload(&image)?);

    let content = decode::decode_owned(bytes.clone(), "drawing.png".to_string(), FrameSize::SPLIT).await?;
    let now = Instant::now();
    let (left, right) = compositor::split(&content, state.panels.size(), now);
    state.panels.put_pair_at(left, right, now).await;

    let address = state.device_address().await;
    let push = state
        .pusher
        .push_content(
            address.as_deref(),
            UploadMode::Split.as_str(),
            vec![ContentFile::new("file_a", "drawing.png", bytes)],
        )
        .await;

    Ok(Json(ContentResponse {
        status: "success",
        message: "Drawing displayed".to_string(),
        push,
    }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiJsonResult<ContentResponse> {
    let mut form = Form::read(multipart).await?;
    let mode: UploadMode = form
        .text("mode")
        .ok_or_else(|| PanelError::invalid("mode not specified"))?
        .parse()?;
    let file_a = form
        .take_file("file_a")
        .ok_or_else(|| PanelError::invalid("file required"))?;
    let file_b = match mode {
        UploadMode::Separate => Some(
            form.take_file("file_b")
                .ok_or_else(|| PanelError::invalid("both files required for separate mode"))?,
        ),
        _ => None,
    };

    let size = mode.decode_size();
    let decode_file = |file: &FormFile| decode::decode_owned(file.bytes.clone(), file.filename.clone(), size);

    // nothing is touched until every file decoded
    match (mode, &file_b) {
        (UploadMode::Separate, Some(file_b)) => {
            let (a, b) = tokio::try_join!(decode_file(&file_a), decode_file(file_b))?;
            state.panels.put_pair(a, b).await;
        }
        (UploadMode::PanelA, _) => state.panels.put(PanelId::A, decode_file(&file_a).await?).await,
        (UploadMode::PanelB, _) => state.panels.put(PanelId::B, decode_file(&file_a).await?).await,
        (UploadMode::Both, _) => {
            let content = decode_file(&file_a).await?;
            state.panels.put_pair(content.clone(), content).await;
        }
        (UploadMode::Split, _) => {
            let content = decode_file(&file_a).await?;
            let now = Instant::now();
            let (left, right) = compositor::split(&content, state.panels.size(), now);
            state.panels.put_pair_at(left, right, now).await;
        }
        (UploadMode::Separate, None) => {
            return Err(PanelError::invalid("both files required for separate mode").into());
        }
    }

    let mut files = vec![ContentFile::new("file_a", file_a.filename, file_a.bytes)];
    if let Some(file_b) = file_b {
        files.push(ContentFile::new("file_b", file_b.filename, file_b.bytes));
    }
    let address = state.device_address().await;
    let push = state
        .pusher
        .push_content(address.as_deref(), mode.as_str(), files)
        .await;

    Ok(Json(ContentResponse {
        status: "success",
        message: format!("Uploaded in {} mode", mode.as_str()),
        push,
    }))
}

#[derive(Deserialize)]
struct ClearQuery {
    panel: Option<String>,
}

#[derive(Serialize)]
pub struct ClearResponse {
    status: &'static str,
    cleared: Vec<PanelId>,
}

async fn clear(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClearQuery>,
) -> ApiJsonResult<ClearResponse> {
    let target = match query.panel.as_deref().map(str::trim) {
        None | Some("") => PanelTarget::Both,
        Some(panel) => panel.parse()?,
    };
    state.panels.clear(target).await;
    Ok(Json(ClearResponse {
        status: "success",
        cleared: target.panels(),
    }))
}
