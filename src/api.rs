use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{auth, handler, state::AppState};

/// Uploads carry whole video files.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub(crate) fn app_router(state: Arc<AppState>) -> Router {
    let operator = Router::new()
        .merge(handler::content::content_router())
        .merge(handler::settings::settings_router())
        .merge(handler::files::files_router())
        .merge(handler::device::device_control_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_operator,
        ));

    Router::new()
        .merge(handler::panel::panel_router())
        .merge(handler::device::device_router())
        .merge(handler::telemetry::telemetry_router())
        .merge(operator)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub(crate) fn start_api_server(state: Arc<AppState>, listen: String, cancel: CancellationToken) {
    tokio::spawn(async move {
        let app = app_router(state);

        let listener = match TcpListener::bind(&listen).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("Error binding API server to {}: {}", listen, e);
                cancel.cancel();
                return;
            }
        };
        log::info!("API server started on {}", listen);
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        {
            log::error!("Error starting API server: {}", e);
        }
    });
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {
            log::info!("Shutting down API server...");
        }
    }
}
